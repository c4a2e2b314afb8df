//! Handles to the real page bodies the engine hides and resizes.

/// How a page body should be shown after a frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ContentVisibility {
    /// The page has crossed the spine; its body is not shown.
    Hidden,
    /// The page body is shown, left-anchored and clipped to `width` pixels.
    Visible { width: f64 },
}

/// A page body living outside the drawing surface.
///
/// The engine only ever sets stacking order once and then toggles visibility and width
/// to follow the curl silhouette.
pub trait PageContent {
    /// Stacking order; earlier pages get larger values and sit on top when flat.
    fn set_stacking_order(&mut self, z: usize);

    fn apply(&mut self, visibility: ContentVisibility);
}

/// In-memory page body that records what the engine asked of it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedPage {
    pub stacking_order: usize,
    /// Last visibility applied; `None` until the page is first drawn.
    pub visibility: Option<ContentVisibility>,
    pub updates: usize,
}

impl RecordedPage {
    pub fn is_hidden(&self) -> bool {
        matches!(self.visibility, Some(ContentVisibility::Hidden))
    }

    pub fn width(&self) -> Option<f64> {
        match self.visibility {
            Some(ContentVisibility::Visible { width }) => Some(width),
            _ => None,
        }
    }
}

impl PageContent for RecordedPage {
    fn set_stacking_order(&mut self, z: usize) {
        self.stacking_order = z;
    }

    fn apply(&mut self, visibility: ContentVisibility) {
        self.visibility = Some(visibility);
        self.updates += 1;
    }
}

impl<T: PageContent + ?Sized> PageContent for Box<T> {
    fn set_stacking_order(&mut self, z: usize) {
        (**self).set_stacking_order(z);
    }

    fn apply(&mut self, visibility: ContentVisibility) {
        (**self).apply(visibility);
    }
}
