use std::path::Path;

use crate::animator::{BUTTON_SPEED, POINTER_SPEED};
use crate::foundation::core::{ContainerSize, Fps};
use crate::foundation::error::{BookError, BookResult};

/// Tunables of the page controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerOpts {
    /// Animator tick rate.
    pub fps: Fps,
    /// Easing fraction per tick while the pointer drives a page.
    pub pointer_speed: f64,
    /// Easing fraction per tick for button-driven turns.
    pub button_speed: f64,
}

impl Default for ControllerOpts {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            pointer_speed: POINTER_SPEED,
            button_speed: BUTTON_SPEED,
        }
    }
}

impl ControllerOpts {
    pub fn validate(&self) -> BookResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        for (name, speed) in [
            ("pointer_speed", self.pointer_speed),
            ("button_speed", self.button_speed),
        ] {
            if !speed.is_finite() || speed <= 0.0 || speed > 1.0 {
                return Err(BookError::config(format!("{name} must be in (0, 1]")));
            }
        }
        Ok(())
    }
}

/// On-disk description of a book widget, as read by the CLI.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookConfig {
    /// Container width in pixels.
    pub width: f64,
    /// Container height in pixels.
    pub height: f64,
    /// Number of leaves.
    pub pages: usize,
    pub fps: Fps,
    pub pointer_speed: f64,
    pub button_speed: f64,
    /// Surface background (straight RGBA8); `None` leaves it transparent.
    pub clear_rgba: Option<[u8; 4]>,
}

impl Default for BookConfig {
    fn default() -> Self {
        let opts = ControllerOpts::default();
        Self {
            width: 800.0,
            height: 480.0,
            pages: 4,
            fps: opts.fps,
            pointer_speed: opts.pointer_speed,
            button_speed: opts.button_speed,
            clear_rgba: Some([246, 244, 238, 255]),
        }
    }
}

impl BookConfig {
    pub fn from_json_str(s: &str) -> BookResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> BookResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BookError::config(format!("read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> BookResult<()> {
        self.container()?;
        self.controller_opts().validate()
    }

    pub fn container(&self) -> BookResult<ContainerSize> {
        ContainerSize::new(self.width, self.height)
    }

    pub fn controller_opts(&self) -> ControllerOpts {
        ControllerOpts {
            fps: self.fps,
            pointer_speed: self.pointer_speed,
            button_speed: self.button_speed,
        }
    }
}
