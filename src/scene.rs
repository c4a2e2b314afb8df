//! Backend-agnostic display list produced by the renderer.

use crate::foundation::core::{BezPath, Point, Rect, Rgba8Premul, Vec2};

/// What part of the book an op belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    Chrome,
    Pages,
    DepthStack,
    CurlShadow,
    Curl,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient axis in `[0, 1]`.
    pub offset: f64,
    pub color: Rgba8Premul,
}

impl GradientStop {
    pub fn new(offset: f64, color: Rgba8Premul) -> Self {
        Self { offset, color }
    }
}

/// Linear gradient along `start -> end`, extended with the end colors on both sides.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    /// Stops sorted by offset.
    pub stops: Vec<GradientStop>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point, stops: impl IntoIterator<Item = GradientStop>) -> Self {
        let mut stops: Vec<GradientStop> = stops.into_iter().collect();
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        Self { start, end, stops }
    }

    /// Parameter of `p` projected onto the gradient axis; `None` for a degenerate axis.
    pub fn param_at(&self, p: Point) -> Option<f64> {
        let axis = self.end - self.start;
        let len2 = axis.hypot2();
        if len2 <= f64::EPSILON || !len2.is_finite() {
            return None;
        }
        Some((p - self.start).dot(axis) / len2)
    }

    /// Color at `p`. A zero-length axis paints nothing.
    pub fn sample(&self, p: Point) -> Rgba8Premul {
        let Some(t) = self.param_at(p) else {
            return Rgba8Premul::transparent();
        };
        self.color_at(t)
    }

    /// Color at axis parameter `t`, interpolated in premultiplied space.
    pub fn color_at(&self, t: f64) -> Rgba8Premul {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Rgba8Premul::transparent();
        };
        if t <= first.offset {
            return first.color;
        }
        if t >= last.offset {
            return last.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = b.offset - a.offset;
                let u = if span <= 0.0 {
                    1.0
                } else {
                    (t - a.offset) / span
                };
                return lerp_color(a.color, b.color, u);
            }
        }
        last.color
    }
}

fn lerp_color(a: Rgba8Premul, b: Rgba8Premul, u: f64) -> Rgba8Premul {
    let l = |x: u8, y: u8| -> u8 {
        let x = f64::from(x);
        let y = f64::from(y);
        (x + (y - x) * u).round().clamp(0.0, 255.0) as u8
    };
    Rgba8Premul {
        r: l(a.r, b.r),
        g: l(a.g, b.g),
        b: l(a.b, b.b),
        a: l(a.a, b.a),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Rgba8Premul),
    Linear(LinearGradient),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub cap: LineCap,
    pub color: Rgba8Premul,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Fill {
        path: BezPath,
        paint: Paint,
    },
    Stroke {
        path: BezPath,
        style: StrokeStyle,
    },
    /// Reset everything painted so far inside `rect` to transparent.
    ClearRect(Rect),
    /// Blurred silhouette of `path`, shifted by `offset`, painted under later ops.
    DropShadow {
        path: BezPath,
        color: Rgba8Premul,
        blur: f64,
        offset: Vec2,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneItem {
    pub layer: Layer,
    pub op: DrawOp,
}

/// Ordered draw ops for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub items: Vec<SceneItem>,
}

impl Scene {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, layer: Layer, op: DrawOp) {
        self.items.push(SceneItem { layer, op });
    }

    pub fn fill(&mut self, layer: Layer, path: BezPath, paint: Paint) {
        self.push(layer, DrawOp::Fill { path, paint });
    }

    pub fn stroke(&mut self, layer: Layer, path: BezPath, style: StrokeStyle) {
        self.push(layer, DrawOp::Stroke { path, style });
    }

    pub fn ops_in(&self, layer: Layer) -> impl Iterator<Item = &DrawOp> {
        self.items
            .iter()
            .filter(move |item| item.layer == layer)
            .map(|item| &item.op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white() -> Rgba8Premul {
        Rgba8Premul::opaque(255, 255, 255)
    }

    fn gray() -> Rgba8Premul {
        Rgba8Premul::opaque(0xdd, 0xdd, 0xdd)
    }

    #[test]
    fn gradient_extends_end_colors() {
        let g = LinearGradient::new(
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            [GradientStop::new(0.0, white()), GradientStop::new(1.0, gray())],
        );
        assert_eq!(g.sample(Point::new(0.0, 5.0)), white());
        assert_eq!(g.sample(Point::new(30.0, 5.0)), gray());
        let mid = g.sample(Point::new(15.0, 99.0));
        assert_eq!(mid.r, 238);
    }

    #[test]
    fn reversed_axis_flips_parameter() {
        let g = LinearGradient::new(
            Point::new(25.0, 0.0),
            Point::new(0.0, 0.0),
            [GradientStop::new(0.7, white()), GradientStop::new(1.0, gray())],
        );
        assert_eq!(g.param_at(Point::new(0.0, 0.0)), Some(1.0));
        assert_eq!(g.sample(Point::new(20.0, 0.0)), white());
        assert_eq!(g.sample(Point::new(-5.0, 0.0)), gray());
    }

    #[test]
    fn degenerate_axis_paints_nothing() {
        let g = LinearGradient::new(
            Point::new(3.0, 3.0),
            Point::new(3.0, 3.0),
            [GradientStop::new(0.0, white())],
        );
        assert_eq!(g.sample(Point::new(3.0, 3.0)), Rgba8Premul::transparent());
    }

    #[test]
    fn stops_are_sorted() {
        let g = LinearGradient::new(
            Point::ZERO,
            Point::new(1.0, 0.0),
            [GradientStop::new(1.0, gray()), GradientStop::new(0.0, white())],
        );
        assert_eq!(g.stops[0].offset, 0.0);
    }

    #[test]
    fn ops_filter_by_layer() {
        let mut scene = Scene::new(4, 4);
        scene.push(Layer::Chrome, DrawOp::ClearRect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        scene.fill(
            Layer::Curl,
            BezPath::new(),
            Paint::Solid(Rgba8Premul::transparent()),
        );
        assert_eq!(scene.ops_in(Layer::Chrome).count(), 1);
        assert_eq!(scene.ops_in(Layer::Curl).count(), 1);
        assert_eq!(scene.ops_in(Layer::Pages).count(), 0);
    }
}
