use crate::foundation::core::{ContainerSize, Point, Rect};

/// Layout metrics of the book spread, derived from the container size.
///
/// Every field is a pure function of the container width and height. A resize replaces the
/// whole value; nothing is updated in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    /// Surface width.
    pub width: f64,
    /// Surface height (includes the band the curl bows into).
    pub height: f64,
    /// Horizontal margin left and right of the pages.
    pub page_x: f64,
    /// Vertical margin above and below the pages.
    pub page_y: f64,
    /// Width of one page.
    pub page_width: f64,
    /// Height of one page.
    pub page_height: f64,
    /// Cover rim around the pages.
    pub book_margin: f64,
    /// Outer width of the cover.
    pub book_width: f64,
    /// Outer height of the cover.
    pub book_height: f64,
}

impl Geometry {
    const PAGE_X_DIVISOR: f64 = 40.0;
    const PAGE_Y_DIVISOR: f64 = 16.0;
    const BOOK_MARGIN_DIVISOR: f64 = 60.0;

    pub fn recompute(size: ContainerSize) -> Self {
        let width = size.width;
        let height = size.height;
        let page_x = width / Self::PAGE_X_DIVISOR;
        let page_y = height / Self::PAGE_Y_DIVISOR;
        let page_width = width / 2.0 - page_x;
        let page_height = height - page_y * 2.0;
        let book_margin = width / Self::BOOK_MARGIN_DIVISOR;
        Self {
            width,
            height,
            page_x,
            page_y,
            page_width,
            page_height,
            book_margin,
            book_width: (page_width + book_margin) * 2.0,
            book_height: page_height + book_margin * 2.0,
        }
    }

    /// Top-left corner of the cover.
    pub fn book_origin(&self) -> Point {
        Point::new(
            self.page_x - self.book_margin,
            self.page_y - self.book_margin,
        )
    }

    /// Top of the spine; the curling page is laid out relative to this point.
    pub fn spine_origin(&self) -> Point {
        Point::new(self.page_width + self.page_x, self.page_y)
    }

    /// Area covered by the two flat pages.
    pub fn spread_rect(&self) -> Rect {
        Rect::new(
            self.page_x,
            self.page_y,
            self.page_x + self.page_width * 2.0,
            self.page_y + self.page_height,
        )
    }
}
