use crate::foundation::error::{BookError, BookResult};

/// Separable Gaussian kernel in Q16 fixed point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GaussianKernel {
    weights: Vec<u32>,
}

impl GaussianKernel {
    /// Kernel for a canvas-style blur: `sigma = blur / 2`, support of three sigmas.
    pub(crate) fn for_blur(blur: f64) -> BookResult<Self> {
        if !blur.is_finite() || blur < 0.0 {
            return Err(BookError::render("shadow blur must be finite and >= 0"));
        }
        let sigma = blur / 2.0;
        if sigma <= 0.0 {
            return Ok(Self {
                weights: vec![1 << 16],
            });
        }
        Self::new((sigma * 3.0).ceil() as u32, sigma)
    }

    pub(crate) fn new(radius: u32, sigma: f64) -> BookResult<Self> {
        if radius == 0 {
            return Ok(Self {
                weights: vec![1 << 16],
            });
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(BookError::render("blur sigma must be > 0"));
        }

        let r = radius as i32;
        let denom = 2.0 * sigma * sigma;
        let raw: Vec<f64> = (-r..=r)
            .map(|i| {
                let x = f64::from(i);
                (-x * x / denom).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Err(BookError::render("gaussian kernel sum is zero"));
        }

        let mut weights: Vec<u32> = raw
            .iter()
            .map(|w| ((w / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
            .collect();
        // Rounding drift goes to the center tap so the kernel preserves energy.
        let total: i64 = weights.iter().map(|&w| i64::from(w)).sum();
        let mid = weights.len() / 2;
        let fixed = (i64::from(weights[mid]) + 65536 - total).clamp(0, 65536);
        weights[mid] = fixed as u32;
        Ok(Self { weights })
    }

    pub(crate) fn radius(&self) -> usize {
        self.weights.len() / 2
    }

    /// Blur a premultiplied RGBA8 buffer, clamping samples at the edges.
    pub(crate) fn blur_rgba8_premul(
        &self,
        src: &[u8],
        width: u32,
        height: u32,
    ) -> BookResult<Vec<u8>> {
        let (w, h) = (width as usize, height as usize);
        let expected = w
            .checked_mul(h)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| BookError::render("blur buffer size overflow"))?;
        if src.len() != expected {
            return Err(BookError::render(
                "blur expects a buffer of width*height*4 bytes",
            ));
        }
        if self.radius() == 0 || expected == 0 {
            return Ok(src.to_vec());
        }

        let mut tmp = vec![0u8; expected];
        let mut out = vec![0u8; expected];
        self.pass(src, &mut tmp, w, h, Axis::Horizontal);
        self.pass(&tmp, &mut out, w, h, Axis::Vertical);
        Ok(out)
    }

    fn pass(&self, src: &[u8], dst: &mut [u8], w: usize, h: usize, axis: Axis) {
        let r = self.radius() as isize;
        let (len, lines) = match axis {
            Axis::Horizontal => (w, h),
            Axis::Vertical => (h, w),
        };
        let index = |line: usize, pos: usize| match axis {
            Axis::Horizontal => (line * w + pos) * 4,
            Axis::Vertical => (pos * w + line) * 4,
        };
        for line in 0..lines {
            for pos in 0..len {
                let mut acc = [0u64; 4];
                for (k, &weight) in self.weights.iter().enumerate() {
                    let sp = (pos as isize + k as isize - r).clamp(0, len as isize - 1) as usize;
                    let idx = index(line, sp);
                    for (c, a) in acc.iter_mut().enumerate() {
                        *a += u64::from(weight) * u64::from(src[idx + c]);
                    }
                }
                let out = index(line, pos);
                for (c, a) in acc.iter().enumerate() {
                    dst[out + c] = (((a + 32768) >> 16).min(255)) as u8;
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}
