use std::time::Duration;

use crate::foundation::error::{BookError, BookResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Rendered size of the book container in pixels.
///
/// Both dimensions are finite and strictly positive; a container that fails this check
/// cannot host a drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContainerSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl ContainerSize {
    /// Create a validated container size.
    pub fn new(width: f64, height: f64) -> BookResult<Self> {
        let size = Self { width, height };
        size.validate()?;
        Ok(size)
    }

    /// Reject sizes that cannot back a drawing surface.
    pub fn validate(self) -> BookResult<()> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(BookError::config("container width must be finite and > 0"));
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(BookError::config(
                "container height must be finite and > 0",
            ));
        }
        Ok(())
    }

    /// Pixel dimensions of the drawing surface backing this container.
    pub fn surface_px(self) -> (u32, u32) {
        let px = |v: f64| v.round().clamp(1.0, f64::from(u32::MAX)) as u32;
        (px(self.width), px(self.height))
    }

    /// Midpoint of the container, the origin of re-centered pointer coordinates.
    pub fn center(self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> BookResult<Self> {
        if den == 0 {
            return Err(BookError::config("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(BookError::config("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Wall-clock interval between two animator ticks.
    pub fn interval(self) -> Duration {
        Duration::from_secs_f64(self.frame_duration_secs())
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 60, den: 1 }
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Opaque color from straight RGB.
    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Straight RGB with a unit-range alpha, as written in CSS `rgba(..)`.
    pub fn rgba(r: u8, g: u8, b: u8, alpha: f64) -> Self {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::from_straight_rgba(r, g, b, a)
    }

    /// Channels as a byte array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}
