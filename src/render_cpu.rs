use std::collections::HashMap;
use std::sync::Arc;

use kurbo::{Cap, Shape, Stroke, StrokeOpts};

use crate::blur_cpu::GaussianKernel;
use crate::foundation::core::{Affine, BezPath, Rect, Rgba8Premul};
use crate::foundation::error::{BookError, BookResult};
use crate::render::{FrameRGBA, RenderBackend, RenderSettings};
use crate::scene::{DrawOp, LineCap, LinearGradient, Paint, Scene, StrokeStyle};

const STROKE_TOLERANCE: f64 = 0.05;
// Curl gradients change every frame; the cache is dropped wholesale once it fills up.
const GRADIENT_CACHE_CAP: usize = 64;

/// CPU raster backend powered by `vello_cpu`.
///
/// Ops are rasterized in runs. A run ends whenever an op needs the pixels painted so far
/// (region clears and drop shadows); it is then composited onto the frame accumulator.
pub struct CpuBackend {
    settings: RenderSettings,
    gradients: GradientCache,
}

impl CpuBackend {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            gradients: GradientCache::default(),
        }
    }

    fn background(&self) -> [u8; 4] {
        self.settings
            .clear_rgba
            .map(|[r, g, b, a]| Rgba8Premul::from_straight_rgba(r, g, b, a).to_array())
            .unwrap_or([0, 0, 0, 0])
    }
}

impl RenderBackend for CpuBackend {
    #[tracing::instrument(skip_all, fields(ops = scene.items.len()))]
    fn render_scene(&mut self, scene: &Scene) -> BookResult<FrameRGBA> {
        let width: u16 = scene
            .width
            .try_into()
            .map_err(|_| BookError::render("surface width exceeds u16"))?;
        let height: u16 = scene
            .height
            .try_into()
            .map_err(|_| BookError::render("surface height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(BookError::render("surface must be at least 1x1"));
        }

        let background = self.background();
        let mut frame = background.repeat(usize::from(width) * usize::from(height));
        let mut run = Run::new(width, height);

        for item in &scene.items {
            match &item.op {
                DrawOp::Fill { path, paint } => run.fill(path, paint, &mut self.gradients)?,
                DrawOp::Stroke { path, style } => {
                    let outline = stroke_outline(path, style);
                    run.fill(&outline, &Paint::Solid(style.color), &mut self.gradients)?;
                }
                DrawOp::ClearRect(rect) => {
                    run.composite_onto(&mut frame)?;
                    fill_rect_bytes(&mut frame, width, height, *rect, background);
                }
                DrawOp::DropShadow {
                    path,
                    color,
                    blur,
                    offset,
                } => {
                    run.composite_onto(&mut frame)?;
                    let mut shadow = Run::new(width, height);
                    let shifted = Affine::translate(*offset) * path.clone();
                    shadow.fill(&shifted, &Paint::Solid(*color), &mut self.gradients)?;
                    let silhouette = shadow.rasterize();
                    let kernel = GaussianKernel::for_blur(*blur)?;
                    let blurred = kernel.blur_rgba8_premul(
                        &silhouette,
                        u32::from(width),
                        u32::from(height),
                    )?;
                    premul_over_in_place(&mut frame, &blurred)?;
                }
            }
        }
        run.composite_onto(&mut frame)?;

        Ok(FrameRGBA {
            width: u32::from(width),
            height: u32::from(height),
            data: frame,
            premultiplied: true,
        })
    }
}

/// A batch of ops drawn into one `vello_cpu` context.
struct Run {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    dirty: bool,
}

impl Run {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ctx: vello_cpu::RenderContext::new(width, height),
            dirty: false,
        }
    }

    fn fill(
        &mut self,
        path: &BezPath,
        paint: &Paint,
        gradients: &mut GradientCache,
    ) -> BookResult<()> {
        if path.elements().is_empty() {
            return Ok(());
        }
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        match paint {
            Paint::Solid(color) => {
                if color.a == 0 {
                    return Ok(());
                }
                let [r, g, b, a] = unpremultiply(*color);
                self.ctx
                    .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            }
            Paint::Linear(gradient) => {
                let bounds = path.bounding_box();
                let Some(paint) = gradients.paint(gradient, bounds, self.width, self.height)?
                else {
                    return Ok(());
                };
                let (x0, y0) = paint.origin;
                self.ctx
                    .set_paint_transform(vello_cpu::kurbo::Affine::translate((
                        x0 as f64, y0 as f64,
                    )));
                self.ctx.set_paint(paint.image);
            }
        }
        self.ctx.fill_path(&bezpath_to_cpu(path));
        self.dirty = true;
        Ok(())
    }

    fn rasterize(&mut self) -> Vec<u8> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        if self.dirty {
            self.ctx.flush();
            self.ctx.render_to_pixmap(&mut pixmap);
        }
        pixmap.data_as_u8_slice().to_vec()
    }

    /// Paint everything drawn so far over `frame` and start an empty run.
    fn composite_onto(&mut self, frame: &mut [u8]) -> BookResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let layer = self.rasterize();
        premul_over_in_place(frame, &layer)?;
        *self = Self::new(self.width, self.height);
        Ok(())
    }
}

fn stroke_outline(path: &BezPath, style: &StrokeStyle) -> BezPath {
    if style.width <= 0.0 || !style.width.is_finite() {
        return BezPath::new();
    }
    let cap = match style.cap {
        LineCap::Butt => Cap::Butt,
        LineCap::Round => Cap::Round,
    };
    let stroke = Stroke::new(style.width).with_caps(cap);
    kurbo::stroke(path.iter(), &stroke, &StrokeOpts::default(), STROKE_TOLERANCE)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct GradientKey {
    axis: [u64; 4],
    stops: Vec<(u64, [u8; 4])>,
    origin: (usize, usize),
    size: (u16, u16),
}

impl GradientKey {
    fn new(gradient: &LinearGradient, origin: (usize, usize), size: (u16, u16)) -> Self {
        let (a, b) = (gradient.start, gradient.end);
        Self {
            axis: [a.x.to_bits(), a.y.to_bits(), b.x.to_bits(), b.y.to_bits()],
            stops: gradient
                .stops
                .iter()
                .map(|s| (s.offset.to_bits(), s.color.to_array()))
                .collect(),
            origin,
            size,
        }
    }
}

/// Gradient image covering only the pixels of its path, placed at `origin`.
#[derive(Clone)]
struct GradientPaint {
    image: vello_cpu::Image,
    origin: (usize, usize),
}

#[derive(Default)]
struct GradientCache {
    images: HashMap<GradientKey, GradientPaint>,
}

impl GradientCache {
    /// Paint for `gradient` over the surface pixels touched by `bounds`; `None` when those
    /// pixels fall outside the surface.
    fn paint(
        &mut self,
        gradient: &LinearGradient,
        bounds: Rect,
        width: u16,
        height: u16,
    ) -> BookResult<Option<GradientPaint>> {
        let (w, h) = (usize::from(width), usize::from(height));
        let x0 = (bounds.x0.floor().max(0.0) as usize).min(w);
        let x1 = (bounds.x1.ceil().max(0.0) as usize).min(w);
        let y0 = (bounds.y0.floor().max(0.0) as usize).min(h);
        let y1 = (bounds.y1.ceil().max(0.0) as usize).min(h);
        if x1 <= x0 || y1 <= y0 {
            return Ok(None);
        }
        // Both spans are bounded by the u16 surface size.
        let (iw, ih) = ((x1 - x0) as u16, (y1 - y0) as u16);

        let key = GradientKey::new(gradient, (x0, y0), (iw, ih));
        if let Some(paint) = self.images.get(&key).cloned() {
            return Ok(Some(paint));
        }

        let stride = usize::from(iw);
        let mut bytes = vec![0u8; stride * usize::from(ih) * 4];
        for (row, y) in (y0..y1).enumerate() {
            for (col, x) in (x0..x1).enumerate() {
                let c = gradient.sample(kurbo::Point::new(x as f64 + 0.5, y as f64 + 0.5));
                let idx = (row * stride + col) * 4;
                bytes[idx..idx + 4].copy_from_slice(&c.to_array());
            }
        }
        let pixmap = pixmap_from_premul_bytes(&bytes, iw, ih)?;
        let paint = GradientPaint {
            image: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            origin: (x0, y0),
        };

        if self.images.len() >= GRADIENT_CACHE_CAP {
            tracing::trace!(entries = self.images.len(), "gradient cache reset");
            self.images.clear();
        }
        self.images.insert(key, paint.clone());
        Ok(Some(paint))
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u16,
    height: u16,
) -> BookResult<vello_cpu::Pixmap> {
    if bytes.len() != usize::from(width) * usize::from(height) * 4 {
        return Err(BookError::render("pixmap byte len mismatch"));
    }
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        })
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, width, height, true,
    ))
}

fn fill_rect_bytes(frame: &mut [u8], width: u16, height: u16, rect: Rect, rgba: [u8; 4]) {
    let (w, h) = (usize::from(width), usize::from(height));
    let x0 = (rect.x0.round().max(0.0) as usize).min(w);
    let x1 = (rect.x1.round().max(0.0) as usize).min(w);
    let y0 = (rect.y0.round().max(0.0) as usize).min(h);
    let y1 = (rect.y1.round().max(0.0) as usize).min(h);
    if x1 <= x0 {
        return;
    }
    for y in y0..y1 {
        for px in frame[(y * w + x0) * 4..(y * w + x1) * 4].chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
}

fn unpremultiply(c: Rgba8Premul) -> [u8; 4] {
    if c.a == 0 {
        return [0, 0, 0, 0];
    }
    let a = u16::from(c.a);
    let un = |v: u8| -> u8 { ((u16::from(v) * 255 + a / 2) / a).min(255) as u8 };
    [un(c.r), un(c.g), un(c.b), c.a]
}

fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> BookResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(BookError::render(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        let inv = 255 - sa;
        for c in 0..4 {
            d[c] = s[c].saturating_add(mul_div255(u16::from(d[c]), inv));
        }
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{GradientStop, Layer};

    fn backend(clear: Option<[u8; 4]>) -> CpuBackend {
        CpuBackend::new(RenderSettings { clear_rgba: clear })
    }

    fn px(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
        frame.pixel(x, y)
    }

    #[test]
    fn empty_scene_is_background() {
        let scene = Scene::new(4, 3);
        let frame = backend(Some([10, 20, 30, 255])).render_scene(&scene).unwrap();
        assert_eq!(frame.data.len(), 4 * 3 * 4);
        assert!(frame.data.chunks_exact(4).all(|p| p == [10, 20, 30, 255]));
        assert!(frame.premultiplied);
    }

    #[test]
    fn solid_fill_covers_interior() {
        let mut scene = Scene::new(16, 16);
        scene.fill(
            Layer::Pages,
            Rect::new(4.0, 4.0, 12.0, 12.0).to_path(0.1),
            Paint::Solid(Rgba8Premul::opaque(200, 0, 0)),
        );
        let frame = backend(None).render_scene(&scene).unwrap();
        assert_eq!(px(&frame, 8, 8), [200, 0, 0, 255]);
        assert_eq!(px(&frame, 1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn clear_rect_restores_background() {
        let mut scene = Scene::new(16, 16);
        scene.fill(
            Layer::Chrome,
            Rect::new(0.0, 0.0, 16.0, 16.0).to_path(0.1),
            Paint::Solid(Rgba8Premul::opaque(0, 0, 255)),
        );
        scene.push(Layer::Chrome, DrawOp::ClearRect(Rect::new(4.0, 4.0, 8.0, 8.0)));
        scene.fill(
            Layer::Pages,
            Rect::new(6.0, 6.0, 16.0, 16.0).to_path(0.1),
            Paint::Solid(Rgba8Premul::opaque(0, 255, 0)),
        );
        let frame = backend(Some([9, 9, 9, 255])).render_scene(&scene).unwrap();
        assert_eq!(px(&frame, 1, 1), [0, 0, 255, 255]);
        assert_eq!(px(&frame, 5, 5), [9, 9, 9, 255]);
        assert_eq!(px(&frame, 7, 7), [0, 255, 0, 255]);
    }

    #[test]
    fn gradient_fill_varies_along_axis() {
        let mut scene = Scene::new(32, 4);
        let gradient = LinearGradient::new(
            kurbo::Point::new(0.0, 0.0),
            kurbo::Point::new(32.0, 0.0),
            [
                GradientStop::new(0.0, Rgba8Premul::opaque(0, 0, 0)),
                GradientStop::new(1.0, Rgba8Premul::opaque(255, 255, 255)),
            ],
        );
        scene.fill(
            Layer::Pages,
            Rect::new(0.0, 0.0, 32.0, 4.0).to_path(0.1),
            Paint::Linear(gradient),
        );
        let frame = backend(None).render_scene(&scene).unwrap();
        let left = px(&frame, 2, 2);
        let right = px(&frame, 29, 2);
        assert!(left[0] < 40, "{left:?}");
        assert!(right[0] > 215, "{right:?}");
        assert_eq!(right[3], 255);
    }

    #[test]
    fn gradient_is_placed_at_its_path_and_reused() {
        let mut scene = Scene::new(64, 4);
        let gradient = LinearGradient::new(
            kurbo::Point::new(16.0, 0.0),
            kurbo::Point::new(48.0, 0.0),
            [
                GradientStop::new(0.0, Rgba8Premul::opaque(0, 0, 0)),
                GradientStop::new(1.0, Rgba8Premul::opaque(255, 255, 255)),
            ],
        );
        scene.fill(
            Layer::Pages,
            Rect::new(16.0, 0.0, 48.0, 4.0).to_path(0.1),
            Paint::Linear(gradient),
        );

        let mut cpu = backend(Some([0, 0, 255, 255]));
        let first = cpu.render_scene(&scene).unwrap();
        let second = cpu.render_scene(&scene).unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(cpu.gradients.len(), 1);

        assert_eq!(px(&first, 5, 2), [0, 0, 255, 255]);
        assert!(px(&first, 18, 2)[0] < 40, "{:?}", px(&first, 18, 2));
        assert!(px(&first, 45, 2)[0] > 215, "{:?}", px(&first, 45, 2));
        assert_eq!(px(&first, 58, 2), [0, 0, 255, 255]);
    }

    #[test]
    fn gradient_cache_stays_bounded() {
        let mut cpu = backend(None);
        for i in 0..(GRADIENT_CACHE_CAP + 5) {
            let x = 1.0 + i as f64 * 0.01;
            let mut scene = Scene::new(8, 8);
            scene.fill(
                Layer::Curl,
                Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1),
                Paint::Linear(LinearGradient::new(
                    kurbo::Point::new(0.0, 0.0),
                    kurbo::Point::new(x, 0.0),
                    [
                        GradientStop::new(0.0, Rgba8Premul::opaque(0, 0, 0)),
                        GradientStop::new(1.0, Rgba8Premul::opaque(255, 255, 255)),
                    ],
                )),
            );
            cpu.render_scene(&scene).unwrap();
        }
        assert!(cpu.gradients.len() <= GRADIENT_CACHE_CAP);
    }

    #[test]
    fn stroke_paints_only_near_the_line() {
        let mut scene = Scene::new(20, 20);
        let mut line = BezPath::new();
        line.move_to((10.0, 2.0));
        line.line_to((10.0, 18.0));
        scene.stroke(
            Layer::Chrome,
            line,
            StrokeStyle {
                width: 4.0,
                cap: LineCap::Butt,
                color: Rgba8Premul::opaque(0, 0, 0),
            },
        );
        let frame = backend(Some([255, 255, 255, 255])).render_scene(&scene).unwrap();
        assert_eq!(px(&frame, 10, 10), [0, 0, 0, 255]);
        assert_eq!(px(&frame, 2, 10), [255, 255, 255, 255]);
    }

    #[test]
    fn drop_shadow_darkens_offset_area() {
        let mut scene = Scene::new(40, 40);
        scene.push(
            Layer::Chrome,
            DrawOp::DropShadow {
                path: Rect::new(5.0, 5.0, 25.0, 25.0).to_path(0.1),
                color: Rgba8Premul::rgba(0, 0, 0, 0.6),
                blur: 2.0,
                offset: kurbo::Vec2::new(8.0, 8.0),
            },
        );
        let frame = backend(Some([255, 255, 255, 255])).render_scene(&scene).unwrap();
        let shaded = px(&frame, 28, 28);
        assert!(shaded[0] < 200, "{shaded:?}");
        assert_eq!(px(&frame, 38, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn oversized_surface_is_rejected() {
        let scene = Scene::new(70_000, 2);
        assert!(backend(None).render_scene(&scene).is_err());
    }

    #[test]
    fn premul_over_is_identity_for_transparent_src() {
        let mut dst = vec![1u8, 2, 3, 4];
        premul_over_in_place(&mut dst, &[0, 0, 0, 0]).unwrap();
        assert_eq!(dst, vec![1, 2, 3, 4]);
        premul_over_in_place(&mut dst, &[5, 6, 7, 255]).unwrap();
        assert_eq!(dst, vec![5, 6, 7, 255]);
    }

    #[test]
    fn unpremultiply_round_trips_opaque() {
        assert_eq!(unpremultiply(Rgba8Premul::opaque(1, 2, 3)), [1, 2, 3, 255]);
        assert_eq!(unpremultiply(Rgba8Premul::transparent()), [0, 0, 0, 0]);
    }
}
