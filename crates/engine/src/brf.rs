//! Braille Ready Format: braille ASCII lines, form feeds between pages.

use std::mem;

use brailleshelf_core::{Dimensions, Page, Row};

use crate::braille::Transcoder;

pub const FORM_FEED: char = '\u{c}';

/// Accumulates BRF lines into fixed-height pages.
pub struct BrfPaginator<'a, T> {
    dimensions: Dimensions,
    transcoder: &'a T,
    pages: Vec<Page>,
    page: Vec<Row>,
}

impl<'a, T: Transcoder> BrfPaginator<'a, T> {
    pub fn new(dimensions: Dimensions, transcoder: &'a T) -> Self {
        Self {
            dimensions,
            transcoder,
            pages: Vec::new(),
            page: Vec::with_capacity(dimensions.height),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        let content = if line.contains(FORM_FEED) {
            self.break_page();
            if line.chars().all(|ch| ch == FORM_FEED) {
                return;
            }
            line.replace(FORM_FEED, "")
        } else {
            line.to_string()
        };

        if self.page.len() == self.dimensions.height {
            self.break_page();
        }
        let cells = self.transcoder.from_ascii(&content);
        self.page.push(Row::fitted(cells, self.dimensions.width));
    }

    /// Pages so far plus the padded trailing page. Input without a single
    /// content line still yields one blank page.
    pub fn finish(mut self) -> Vec<Page> {
        self.break_page();
        if self.pages.is_empty() {
            self.pages.push(Page::blank(self.dimensions));
        }
        self.pages
    }

    fn break_page(&mut self) {
        if self.page.is_empty() {
            return;
        }
        let rows = mem::take(&mut self.page);
        self.pages.push(Page::padded(rows, self.dimensions));
    }
}

/// Paginates a whole BRF document in one go.
pub fn paginate<T: Transcoder>(text: &str, dimensions: Dimensions, transcoder: &T) -> Vec<Page> {
    let mut paginator = BrfPaginator::new(dimensions, transcoder);
    for line in text.lines() {
        paginator.push_line(line);
    }
    paginator.finish()
}
