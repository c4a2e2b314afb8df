//! Frame construction: book chrome, flat pages and the curling leaf.
//!
//! The renderer is pure. It turns a [`FrameSnapshot`] into a [`Scene`] and a
//! [`ContentVisibility`] for the page being drawn; executing the scene is the job of a
//! [`RenderBackend`].

use kurbo::Shape;

use crate::content::ContentVisibility;
use crate::flip::FlipState;
use crate::foundation::core::{Affine, BezPath, ContainerSize, Point, Rect, Rgba8Premul, Vec2};
use crate::foundation::error::BookResult;
use crate::geometry::Geometry;
use crate::scene::{
    DrawOp, GradientStop, Layer, LineCap, LinearGradient, Paint, Scene, StrokeStyle,
};

/// Most stacked-page layers drawn on either side of the spread.
pub const MAX_DEPTH_LAYERS: usize = 2;
/// Horizontal shift between stacked-page layers.
pub const DEPTH_STEP_X: f64 = 2.0;
/// Vertical stagger between stacked-page layers.
pub const DEPTH_STEP_Y: f64 = 0.625;

const COVER: Rgba8Premul = Rgba8Premul {
    r: 0xbf,
    g: 0xb3,
    b: 0x8c,
    a: 255,
};
const PAPER: Rgba8Premul = Rgba8Premul {
    r: 0xff,
    g: 0xff,
    b: 0xff,
    a: 255,
};
const PAPER_LIGHT: Rgba8Premul = Rgba8Premul {
    r: 0xee,
    g: 0xee,
    b: 0xee,
    a: 255,
};
const PAPER_DARK: Rgba8Premul = Rgba8Premul {
    r: 0xdd,
    g: 0xdd,
    b: 0xdd,
    a: 255,
};
const OUTLINE_WIDTH: f64 = 0.5;
const SPINE_START: f64 = 0.488;
const SPINE_END: f64 = 0.512;

/// A rendered frame as RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)`; out-of-bounds reads are transparent.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Executes a [`Scene`] into pixels.
pub trait RenderBackend {
    fn render_scene(&mut self, scene: &Scene) -> BookResult<FrameRGBA>;
}

/// Backend-agnostic settings.
#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// Surface background; `None` keeps the surface transparent.
    pub clear_rgba: Option<[u8; 4]>,
}

/// Available backend kinds.
#[derive(Clone, Copy, Debug)]
pub enum BackendKind {
    /// CPU raster backend powered by `vello_cpu`.
    Cpu,
}

pub fn create_backend(
    kind: BackendKind,
    settings: &RenderSettings,
) -> BookResult<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(crate::render_cpu::CpuBackend::new(
            settings.clone(),
        ))),
    }
}

/// Immutable view of the book handed to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSnapshot {
    pub geometry: Geometry,
    pub flips: Vec<FlipState>,
    /// Page drawn as the curling leaf; `None` draws the resting spread.
    pub active: Option<usize>,
}

impl FrameSnapshot {
    /// State of the leaf being drawn. The resting spread uses an unturned page.
    pub fn active_flip(&self) -> FlipState {
        self.active
            .and_then(|i| self.flips.get(i))
            .copied()
            .unwrap_or_default()
    }
}

/// Curl-dependent magnitudes of the leaf, in spine-relative coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurlMetrics {
    pub strength: f64,
    pub fold_width: f64,
    pub fold_x: f64,
    pub vertical_outdent: f64,
    pub shadow_width: f64,
    pub paper_shadow_width: f64,
}

impl CurlMetrics {
    pub fn new(progress: f64, geometry: &Geometry) -> Self {
        let pw = geometry.page_width;
        let strength = 1.0 - progress.abs();
        let fold_width = pw / 2.0 * (1.0 - progress);
        Self {
            strength,
            fold_width,
            fold_x: pw * progress + fold_width,
            vertical_outdent: geometry.page_y * 6.0 / 8.0 * strength,
            shadow_width: pw / 2.0 * strength.clamp(0.0, 0.5),
            paper_shadow_width: pw / 2.0 * (1.0 - progress).clamp(0.0, 0.5),
        }
    }

    /// x of the edge still attached to the spine side of the fold.
    pub fn trailing_x(&self) -> f64 {
        self.fold_x - self.fold_width
    }
}

/// Stacked-page layers on either side of the spread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepthCue {
    pub left: usize,
    pub right: usize,
}

impl DepthCue {
    /// Count settled pages other than the curling one; the face page on the right is not a
    /// stack layer.
    pub fn new(flips: &[FlipState], active: Option<usize>) -> Self {
        let others = || {
            flips
                .iter()
                .enumerate()
                .filter(move |(i, _)| Some(*i) != active)
                .map(|(_, f)| f)
        };
        let left = others().filter(|f| f.is_turned()).count();
        let right = others()
            .filter(|f| f.is_unturned())
            .count()
            .saturating_sub(1);
        Self {
            left: left.min(MAX_DEPTH_LAYERS),
            right: right.min(MAX_DEPTH_LAYERS),
        }
    }
}

/// How the real page body should follow the leaf at `progress`.
pub fn content_visibility(progress: f64, geometry: &Geometry) -> ContentVisibility {
    if progress < 0.0 {
        return ContentVisibility::Hidden;
    }
    let metrics = CurlMetrics::new(progress, geometry);
    ContentVisibility::Visible {
        width: metrics.fold_x.max(0.0),
    }
}

/// Build the full frame for `frame`.
pub fn build_scene(frame: &FrameSnapshot) -> Scene {
    let g = &frame.geometry;
    let (w, h) = ContainerSize {
        width: g.width,
        height: g.height,
    }
    .surface_px();
    let mut scene = Scene::new(w, h);
    draw_book(&mut scene, g);
    draw_pages(&mut scene, g);
    draw_flip(
        &mut scene,
        g,
        &frame.active_flip(),
        DepthCue::new(&frame.flips, frame.active),
    );
    scene
}

fn draw_book(scene: &mut Scene, g: &Geometry) {
    let at = Affine::translate(g.book_origin().to_vec2());
    let (bw, bh) = (g.book_width, g.book_height);
    let cover = at * Rect::new(0.0, 0.0, bw, bh).to_path(0.1);

    scene.push(
        Layer::Chrome,
        DrawOp::DropShadow {
            path: cover.clone(),
            color: Rgba8Premul::rgba(0, 0, 0, 0.6),
            blur: 8.0,
            offset: Vec2::new(2.0, 4.0),
        },
    );
    scene.fill(Layer::Chrome, cover, Paint::Solid(COVER));

    let spine = Rect::new(bw * SPINE_START, 0.0, bw * SPINE_END, bh);
    scene.fill(
        Layer::Chrome,
        at * spine.to_path(0.1),
        Paint::Solid(Rgba8Premul::rgba(0, 0, 0, 0.3)),
    );

    let edge = |color| StrokeStyle {
        width: 2.0,
        cap: LineCap::Round,
        color,
    };
    let highlight = edge(Rgba8Premul::rgba(255, 255, 255, 0.3));
    let shade = edge(Rgba8Premul::rgba(0, 0, 0, 0.3));
    let (s0, s1) = (bw * SPINE_START, bw * SPINE_END);

    for pts in [
        [(s0, 0.0), (0.0, 0.0), (0.0, bh)],
        [(bw, 0.0), (s1, 0.0), (s1, bh)],
    ] {
        scene.stroke(Layer::Chrome, at * polyline(&pts), highlight);
    }
    for pts in [
        [(s0, 0.0), (s0, bh), (0.0, bh)],
        [(bw, 0.0), (bw, bh), (s1, bh)],
    ] {
        scene.stroke(Layer::Chrome, at * polyline(&pts), shade);
    }

    let m = g.book_margin;
    let spread = Rect::new(m, m, m + g.page_width * 2.0, m + g.page_height);
    scene.push(
        Layer::Chrome,
        DrawOp::ClearRect(at.transform_rect_bbox(spread)),
    );
}

fn draw_pages(scene: &mut Scene, g: &Geometry) {
    let (pw, ph) = (g.page_width, g.page_height);
    let outline = StrokeStyle {
        width: OUTLINE_WIDTH,
        cap: LineCap::Butt,
        color: Rgba8Premul::rgba(0, 0, 0, 0.6),
    };
    let face = [(0.0, 0.0), (pw, 0.0), (pw, ph), (0.0, ph)];

    let left = Affine::translate((g.page_x, g.page_y));
    let left_fold = LinearGradient::new(
        left * Point::new(pw * 0.75, 0.0),
        left * Point::new(pw, 0.0),
        [
            GradientStop::new(0.0, PAPER),
            GradientStop::new(0.7, PAPER_LIGHT),
            GradientStop::new(0.9, PAPER),
            GradientStop::new(1.0, PAPER_DARK),
        ],
    );
    scene.stroke(Layer::Pages, left * polyline(&face), outline);
    scene.fill(Layer::Pages, left * polygon(&face), Paint::Linear(left_fold));

    let right = Affine::translate((g.page_x + pw, g.page_y));
    let right_fold = LinearGradient::new(
        right * Point::new(pw * 0.25, 0.0),
        right * Point::new(0.0, 0.0),
        [
            GradientStop::new(0.7, Rgba8Premul::rgba(255, 255, 255, 0.0)),
            GradientStop::new(0.9, Rgba8Premul::rgba(221, 221, 221, 0.5)),
            GradientStop::new(1.0, Rgba8Premul::rgba(102, 102, 102, 0.5)),
        ],
    );
    scene.stroke(Layer::Pages, right * polyline(&face), outline);
    scene.fill(Layer::Pages, right * polygon(&face), Paint::Linear(right_fold));
}

fn draw_flip(scene: &mut Scene, g: &Geometry, flip: &FlipState, depth: DepthCue) {
    let at = Affine::translate(g.spine_origin().to_vec2());
    let (pw, ph) = (g.page_width, g.page_height);
    let c = CurlMetrics::new(flip.progress(), g);
    let outline = StrokeStyle {
        width: OUTLINE_WIDTH,
        cap: LineCap::Butt,
        color: Rgba8Premul::rgba(0, 0, 0, 0.6),
    };

    for i in 0..depth.left {
        let layer = depth_layer(i, |x| -pw - x, |x| -x, ph);
        scene.stroke(Layer::DepthStack, at * polyline(&layer), outline);
        scene.fill(
            Layer::DepthStack,
            at * polygon(&layer),
            Paint::Solid(PAPER_LIGHT),
        );
    }
    for i in 0..depth.right {
        let layer = depth_layer(i, |x| pw + x, |x| x, ph);
        scene.stroke(Layer::DepthStack, at * polyline(&layer), outline);
        scene.fill(
            Layer::DepthStack,
            at * polygon(&layer),
            Paint::Solid(PAPER_LIGHT),
        );
    }

    let trailing = c.trailing_x();
    let strong_width = 30.0 * c.strength;
    if strong_width > 0.0 {
        scene.stroke(
            Layer::CurlShadow,
            at * polyline(&[
                (trailing, -c.vertical_outdent * 0.5),
                (trailing, ph + c.vertical_outdent * 0.5),
            ]),
            StrokeStyle {
                width: strong_width,
                cap: LineCap::Butt,
                color: Rgba8Premul::rgba(0, 0, 0, c.strength * 0.05),
            },
        );
    }

    if c.shadow_width > 0.0 {
        let right_band = LinearGradient::new(
            at * Point::new(c.fold_x, 0.0),
            at * Point::new(c.fold_x + c.shadow_width, 0.0),
            [
                GradientStop::new(0.0, Rgba8Premul::rgba(0, 0, 0, css_alpha(c.strength * 0.2))),
                GradientStop::new(0.8, Rgba8Premul::transparent()),
            ],
        );
        scene.fill(
            Layer::CurlShadow,
            at * Rect::new(c.fold_x, 0.0, c.fold_x + c.shadow_width, ph).to_path(0.1),
            Paint::Linear(right_band),
        );

        let left_band = LinearGradient::new(
            at * Point::new(trailing - c.shadow_width, 0.0),
            at * Point::new(trailing, 0.0),
            [
                GradientStop::new(0.0, Rgba8Premul::transparent()),
                GradientStop::new(1.0, Rgba8Premul::rgba(0, 0, 0, css_alpha(c.strength * 0.15))),
            ],
        );
        scene.fill(
            Layer::CurlShadow,
            at * Rect::new(trailing - c.shadow_width, 0.0, trailing, ph).to_path(0.1),
            Paint::Linear(left_band),
        );
    }

    let leaf = at * leaf_path(&c, ph);
    let paper = LinearGradient::new(
        at * Point::new(c.fold_x - c.paper_shadow_width, 0.0),
        at * Point::new(c.fold_x, 0.0),
        [
            GradientStop::new(0.35, PAPER),
            GradientStop::new(0.73, PAPER_LIGHT),
            GradientStop::new(0.9, PAPER),
            GradientStop::new(1.0, PAPER_DARK),
        ],
    );
    scene.stroke(Layer::Curl, leaf.clone(), outline);
    scene.fill(Layer::Curl, leaf, Paint::Linear(paper));
}

/// Outline of the curling leaf: vertical edges at `fold_x` and the trailing edge, joined by
/// quadratic curves that bow past the page by the vertical outdent.
pub fn leaf_path(c: &CurlMetrics, page_height: f64) -> BezPath {
    let vo = c.vertical_outdent;
    let trailing = c.trailing_x();
    let mut path = BezPath::new();
    path.move_to((c.fold_x, page_height));
    path.quad_to(
        (c.fold_x, page_height + vo * 2.0),
        (trailing, page_height + vo),
    );
    path.line_to((trailing, -vo));
    path.quad_to((c.fold_x, -vo * 2.0), (c.fold_x, 0.0));
    path.close_path();
    path
}

fn depth_layer(
    i: usize,
    outer: impl Fn(f64) -> f64,
    inner: impl Fn(f64) -> f64,
    page_height: f64,
) -> [(f64, f64); 6] {
    let i = i as f64;
    let (dx0, dx1) = (i * DEPTH_STEP_X, (i + 1.0) * DEPTH_STEP_X);
    let (dy0, dy1) = (i * DEPTH_STEP_Y, (i + 1.0) * DEPTH_STEP_Y);
    [
        (outer(dx0), dy0),
        (outer(dx0), page_height + dy0),
        (inner(dx0), page_height + dy0),
        (inner(dx0), page_height + dy1),
        (outer(dx1), page_height + dy1),
        (outer(dx1), dy0),
    ]
}

/// Alpha rounded to two decimals, matching CSS color strings.
fn css_alpha(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn polyline(points: &[(f64, f64)]) -> BezPath {
    let mut path = BezPath::new();
    let mut it = points.iter();
    if let Some(&first) = it.next() {
        path.move_to(first);
        for &p in it {
            path.line_to(p);
        }
    }
    path
}

fn polygon(points: &[(f64, f64)]) -> BezPath {
    let mut path = polyline(points);
    if !points.is_empty() {
        path.close_path();
    }
    path
}
