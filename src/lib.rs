//! Pageflip is a page-turning book engine.
//!
//! A [`PageController`] owns per-page flip progress, maps pointer gestures and button
//! turns onto it and eases everything on a fixed-rate [`Animator`]. Frames are described
//! as a [`Scene`] of 2D draw ops and rasterized by a [`RenderBackend`]:
//!
//! - Build a controller over your page bodies ([`PageContent`])
//! - Feed it input ([`BookEvent`]) and tick it while it animates
//! - Render each requested [`FrameSnapshot`], or let a [`FlipSession`] do both
#![forbid(unsafe_code)]

mod foundation;

pub mod animator;
mod blur_cpu;
pub mod config;
pub mod content;
pub mod controller;
pub mod events;
pub mod flip;
pub mod geometry;
pub mod input;
pub mod render;
mod render_cpu;
pub mod scene;
pub mod session;

pub use crate::foundation::core::{
    Affine, BezPath, ContainerSize, Fps, Point, Rect, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{BookError, BookResult};

pub use crate::animator::{Animator, TickReport};
pub use crate::config::{BookConfig, ControllerOpts};
pub use crate::content::{ContentVisibility, PageContent, RecordedPage};
pub use crate::controller::PageController;
pub use crate::events::{BookEvent, parse_script};
pub use crate::flip::FlipState;
pub use crate::geometry::Geometry;
pub use crate::input::{Release, Side};
pub use crate::render::{
    BackendKind, FrameRGBA, FrameSnapshot, RenderBackend, RenderSettings, build_scene,
    create_backend,
};
pub use crate::render_cpu::CpuBackend;
pub use crate::scene::{DrawOp, Layer, Scene};
pub use crate::session::{FlipSession, PlayStats};
