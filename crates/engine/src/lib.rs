//! Book parsing: BRF and PEF files to pages of braille cells.

use std::future::Future;
use std::path::Path;

use brailleshelf_core::{Book, Dimensions, LoadStatus, MANUAL_PATH, Page, Row};
use log::{debug, warn};
use thiserror::Error;

pub mod braille;
pub mod brf;
pub mod pef;

pub use braille::{StandardTranscoder, Transcoder};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("book file is empty")]
    Empty,

    #[error("unsupported book format: {0:?}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("document ends inside an open page")]
    Truncated,

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookFormat {
    Brf,
    Pef,
}

impl BookFormat {
    pub fn from_ext(ext: &str) -> Result<Self, ParseError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "brf" => Ok(BookFormat::Brf),
            "pef" => Ok(BookFormat::Pef),
            other => Err(ParseError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_ext(ext).ok()
    }
}

/// `Fast` parses in one go for on-demand viewing; `Background` yields to the
/// scheduler between lines and pages. Both produce the same pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Fast,
    Background,
}

impl LoadMode {
    async fn pause(self) {
        if self == LoadMode::Background {
            tokio::task::yield_now().await;
        }
    }
}

/// The seam the load scheduler parses books through.
pub trait PageLoader {
    fn load(&self, book: &Book, mode: LoadMode) -> impl Future<Output = Book>;
}

#[derive(Debug, Clone, Default)]
pub struct Engine<T = StandardTranscoder> {
    transcoder: T,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Transcoder> Engine<T> {
    pub fn with_transcoder(transcoder: T) -> Self {
        Self { transcoder }
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    /// Parses the book file into pages. Never fails: any error turns into
    /// a FAILED book and no pages are published.
    pub async fn read_pages(&self, book: &Book, mode: LoadMode) -> Book {
        if book.status == LoadStatus::Done && book.is_loaded() {
            return book.clone();
        }
        debug!("reading pages {}", book.path);
        match self.try_read_pages(book, mode).await {
            Ok(pages) => book.with_pages(pages),
            Err(ParseError::Empty) => {
                warn!("book empty {}", book.path);
                book.with_status(LoadStatus::Failed)
            }
            Err(err) => {
                warn!("book loading failed for {}: {err}", book.path);
                book.with_status(LoadStatus::Failed)
            }
        }
    }

    async fn try_read_pages(&self, book: &Book, mode: LoadMode) -> Result<Vec<Page>, ParseError> {
        let format = BookFormat::from_ext(&book.ext)?;
        let bytes = tokio::fs::read(&book.path).await?;
        if bytes.is_empty() {
            return Err(ParseError::Empty);
        }
        match format {
            BookFormat::Brf => self.read_brf(&bytes, book.dimensions, mode).await,
            BookFormat::Pef => self.read_pef(&bytes, book.dimensions, mode).await,
        }
    }

    async fn read_brf(
        &self,
        bytes: &[u8],
        dimensions: Dimensions,
        mode: LoadMode,
    ) -> Result<Vec<Page>, ParseError> {
        let text = String::from_utf8_lossy(bytes);
        let mut paginator = brf::BrfPaginator::new(dimensions, &self.transcoder);
        for line in text.lines() {
            paginator.push_line(line);
            mode.pause().await;
        }
        Ok(paginator.finish())
    }

    /// Rows from every page are chunked again by display height; the page
    /// boundaries in the document are not kept.
    async fn read_pef(
        &self,
        bytes: &[u8],
        dimensions: Dimensions,
        mode: LoadMode,
    ) -> Result<Vec<Page>, ParseError> {
        let content = std::str::from_utf8(strip_bom(bytes))?;
        let mut reader = pef::RowReader::new(content);
        mode.pause().await;

        let mut rows = Vec::new();
        while let Some(page) = reader.next_page()? {
            for line in page {
                let cells = self.transcoder.from_unicode(&line);
                rows.push(Row::fitted(cells, dimensions.width));
            }
            mode.pause().await;
        }

        if rows.is_empty() {
            return Ok(vec![Page::blank(dimensions)]);
        }
        let height = dimensions.height.max(1);
        Ok(rows
            .chunks(height)
            .map(|chunk| Page::padded(chunk.to_vec(), dimensions))
            .collect())
    }

    /// The built-in manual, shown when no other book is selected.
    pub fn manual(&self, dimensions: Dimensions) -> Book {
        let pages = brf::paginate(MANUAL_TEXT, dimensions, &self.transcoder);
        Book::prebuilt(MANUAL_PATH, "brailleshelf manual", dimensions, pages)
    }
}

impl<T: Transcoder> PageLoader for Engine<T> {
    fn load(&self, book: &Book, mode: LoadMode) -> impl Future<Output = Book> {
        self.read_pages(book, mode)
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

const MANUAL_TEXT: &str = "\
,BRAILLE,SHELF MANUAL
PRESS THE ARROW BUTTONS TO TURN PAGES4
PRESS ,B TO BOOKMARK THE CURRENT PAGE4
BOOKS ARE READ FROM THE ,S,D CARD AND
,U,S,B STICKS1 IN ,B,R,F OR ,P,E,F
FORMAT4
\u{c}
YOUR PAGE AND BOOKMARKS ARE SAVED NEXT
TO EACH BOOK1 SO THEY FOLLOW THE CARD
FROM DEVICE TO DEVICE4
";

#[cfg(test)]
mod tests {
    use super::*;
    use brailleshelf_core::Cell;
    use std::fs;

    fn dims() -> Dimensions {
        Dimensions {
            width: 10,
            height: 3,
        }
    }

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write book");
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn brf_book_loads_with_end_bookmark() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "seven.brf", "A\nB\nC\nD\nE\nF\nG\n");
        let book = Book::new(path, dims());

        let loaded = Engine::new().read_pages(&book, LoadMode::Background).await;
        assert_eq!(loaded.status, LoadStatus::Done);
        assert_eq!(loaded.page_count(), 3);
        assert_eq!(loaded.bookmarks, vec![0, 2]);
    }

    #[tokio::test]
    async fn fast_and_background_modes_agree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "b.brf", "AB\n\u{c}\nCD\nEF\nGH\nIJ\n");
        let book = Book::new(path, dims());
        let engine = Engine::new();

        let fast = engine.read_pages(&book, LoadMode::Fast).await;
        let slow = engine.read_pages(&book, LoadMode::Background).await;
        assert_eq!(fast, slow);
    }

    #[tokio::test]
    async fn empty_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "empty.brf", "");
        let book = Book::new(path, dims());

        let loaded = Engine::new().read_pages(&book, LoadMode::Fast).await;
        assert_eq!(loaded.status, LoadStatus::Failed);
        assert!(loaded.pages.is_empty());
    }

    #[tokio::test]
    async fn missing_file_fails() {
        let book = Book::new("/nonexistent/brailleshelf/missing.brf", dims());
        let loaded = Engine::new().read_pages(&book, LoadMode::Fast).await;
        assert_eq!(loaded.status, LoadStatus::Failed);
    }

    #[tokio::test]
    async fn unsupported_extension_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "notes.txt", "A\n");
        let book = Book::new(path, dims());

        let loaded = Engine::new().read_pages(&book, LoadMode::Fast).await;
        assert_eq!(loaded.status, LoadStatus::Failed);
    }

    #[tokio::test]
    async fn pef_rows_are_rechunked_by_height() {
        let dir = tempfile::tempdir().expect("tempdir");
        let xml = r#"<?xml version="1.0"?>
<pef xmlns="http://www.daisy.org/ns/2008/pef"><body>
<page><row>⠁</row><row>⠃</row></page>
<page><row>⠉</row><row>⠙</row></page>
</body></pef>"#;
        let path = write(&dir, "book.pef", xml);
        let book = Book::new(path, dims());

        let loaded = Engine::new().read_pages(&book, LoadMode::Background).await;
        assert_eq!(loaded.status, LoadStatus::Done);
        assert_eq!(loaded.page_count(), 2);
        let first: Vec<Cell> = loaded.pages[0]
            .rows()
            .iter()
            .map(|row| row.cells()[0])
            .collect();
        assert_eq!(first, vec![Cell(1), Cell(3), Cell(9)]);
        assert_eq!(loaded.pages[1].rows()[0].cells()[0], Cell(25));
        assert!(loaded.pages[1].rows()[1].is_blank());
    }

    #[tokio::test]
    async fn malformed_pef_fails_without_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let xml = r#"<pef xmlns="http://www.daisy.org/ns/2008/pef"><page><row>⠁</page>"#;
        let path = write(&dir, "bad.pef", xml);
        let book = Book::new(path, dims());

        let loaded = Engine::new().read_pages(&book, LoadMode::Fast).await;
        assert_eq!(loaded.status, LoadStatus::Failed);
        assert!(loaded.pages.is_empty());
    }

    #[tokio::test]
    async fn truncated_pef_fails_without_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let xml = r#"<pef xmlns="http://www.daisy.org/ns/2008/pef"><body>
<page><row>⠁</row></page><page><row>⠃"#;
        let path = write(&dir, "cut.pef", xml);
        let book = Book::new(path, dims());

        let loaded = Engine::new().read_pages(&book, LoadMode::Fast).await;
        assert_eq!(loaded.status, LoadStatus::Failed);
        assert!(loaded.pages.is_empty());
    }

    #[tokio::test]
    async fn loading_twice_is_deterministic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "b.brf", "HELLO\nWORLD\nAGAIN\nMORE\n");
        let book = Book::new(path, dims());
        let engine = Engine::new();

        let first = engine.read_pages(&book, LoadMode::Fast).await;
        let second = engine.read_pages(&book, LoadMode::Fast).await;
        assert_eq!(first.pages, second.pages);
    }

    #[test]
    fn manual_is_ready_without_parsing() {
        let manual = Engine::new().manual(Dimensions::default());
        assert_eq!(manual.path, MANUAL_PATH);
        assert_eq!(manual.status, LoadStatus::Done);
        assert!(manual.page_count() >= 2);
        assert!(manual.pages.iter().all(|p| p.rows().len() == 9));
    }

    #[test]
    fn format_from_ext_is_case_insensitive() {
        assert_eq!(BookFormat::from_ext("BRF").ok(), Some(BookFormat::Brf));
        assert_eq!(BookFormat::from_ext(".pef").ok(), Some(BookFormat::Pef));
        assert!(BookFormat::from_ext("epub").is_err());
    }
}
