use crate::foundation::error::BookResult;

/// One input to the book, as delivered by the host.
///
/// Pointer coordinates are container-relative pixels; touch and mouse input are expected
/// to be normalized into this stream before they reach the engine.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookEvent {
    /// Pointer pressed.
    Down { x: f64, y: f64 },
    /// Pointer moved, pressed or not.
    Move { x: f64, y: f64 },
    /// Pointer released.
    Up,
    /// Pointer left the surface; resolves like [`BookEvent::Up`].
    Leave,
    /// "Turn back" control.
    Prev,
    /// "Turn forward" control.
    Next,
    /// Container was resized.
    Resize { width: f64, height: f64 },
    /// Let the animator run for `ticks` frames.
    Wait { ticks: u32 },
}

/// Parse a JSON array of events.
pub fn parse_script(json: &str) -> BookResult<Vec<BookEvent>> {
    Ok(serde_json::from_str(json)?)
}
