//! Core domain types for brailleshelf.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

mod config;

pub use config::{Config, Dimensions, SourceRoot};

/// Library key of the built-in manual; it has no file behind it.
pub const MANUAL_PATH: &str = "manual";

/// Extensions the parser understands, lowercase and without the dot.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["brf", "pef"];

/// One braille character: bit `n` is raised dot `n + 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cell(pub u8);

impl Cell {
    pub const EMPTY: Cell = Cell(0);

    pub fn dots(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn to_unicode(self) -> char {
        char::from_u32(0x2800 + u32::from(self.0)).unwrap_or(' ')
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Row(Vec<Cell>);

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self(cells)
    }

    pub fn blank(width: usize) -> Self {
        Self(vec![Cell::EMPTY; width])
    }

    /// Truncates or pads with empty cells to exactly `width`.
    pub fn fitted(mut cells: Vec<Cell>, width: usize) -> Self {
        cells.resize(width, Cell::EMPTY);
        Self(cells)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|cell| cell.is_empty())
    }

    pub fn to_unicode(&self) -> String {
        self.0.iter().map(|cell| cell.to_unicode()).collect()
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Self(cells)
    }
}

/// A block of exactly `height` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page(Vec<Row>);

impl Page {
    /// Pads short content with blank rows up to the display height.
    pub fn padded(mut rows: Vec<Row>, dimensions: Dimensions) -> Self {
        while rows.len() < dimensions.height {
            rows.push(Row::blank(dimensions.width));
        }
        Self(rows)
    }

    pub fn blank(dimensions: Dimensions) -> Self {
        Self::padded(Vec::new(), dimensions)
    }

    pub fn rows(&self) -> &[Row] {
        &self.0
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Initial,
    Loading,
    Done,
    Failed,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Initial => "initial",
            LoadStatus::Loading => "loading",
            LoadStatus::Done => "done",
            LoadStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable book snapshot. Every change goes through a `with_*` method
/// that hands back a new value; pages are shared between snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub path: String,
    pub title: String,
    pub ext: String,
    pub dimensions: Dimensions,
    pub pages: Arc<[Page]>,
    pub page_index: usize,
    pub bookmarks: Vec<usize>,
    pub status: LoadStatus,
}

impl Book {
    pub fn new(path: impl Into<String>, dimensions: Dimensions) -> Self {
        let path = path.into();
        let file = Path::new(&path);
        let title = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();
        let ext = file
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            path,
            title,
            ext,
            dimensions,
            pages: Arc::from(Vec::new()),
            page_index: 0,
            bookmarks: vec![0],
            status: LoadStatus::Initial,
        }
    }

    /// A book whose pages exist without a parse, like the built-in manual.
    pub fn prebuilt(
        path: impl Into<String>,
        title: impl Into<String>,
        dimensions: Dimensions,
        pages: Vec<Page>,
    ) -> Self {
        let mut book = Self::new(path, dimensions);
        book.title = title.into();
        book.with_pages(pages)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_loaded(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn last_page(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    /// The page at `index`, clamped to the last loaded page.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index.min(self.last_page()))
    }

    pub fn with_status(&self, status: LoadStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Publishes freshly parsed pages: status DONE, page index clamped, and
    /// the end-of-book bookmark added for multi-page books.
    pub fn with_pages(&self, pages: Vec<Page>) -> Self {
        let mut book = self.clone();
        book.pages = Arc::from(pages);
        book.status = LoadStatus::Done;
        book.page_index = book.page_index.min(book.last_page());
        let last = book.last_page();
        book.bookmarks.retain(|&bm| bm <= last);
        if book.page_count() > 1 {
            book.bookmarks.push(last);
        }
        normalize_bookmarks(&mut book.bookmarks);
        book
    }

    /// Sets the current page. Loaded books clamp to their last page; an
    /// unloaded book keeps the value until its pages arrive.
    pub fn with_page_index(&self, index: usize) -> Self {
        let page_index = if self.is_loaded() {
            index.min(self.last_page())
        } else {
            index
        };
        Self {
            page_index,
            ..self.clone()
        }
    }

    pub fn with_bookmarks(&self, extra: impl IntoIterator<Item = usize>) -> Self {
        let mut bookmarks = self.bookmarks.clone();
        bookmarks.extend(extra);
        normalize_bookmarks(&mut bookmarks);
        Self {
            bookmarks,
            ..self.clone()
        }
    }

    pub fn with_bookmark(&self, page: usize) -> Self {
        self.with_bookmarks([page])
    }

    /// Removes a user bookmark. The synthetic start and end bookmarks stay.
    pub fn without_bookmark(&self, page: usize) -> Self {
        if self.is_synthetic_bookmark(page) {
            return self.clone();
        }
        let mut bookmarks = self.bookmarks.clone();
        bookmarks.retain(|&bm| bm != page);
        Self {
            bookmarks,
            ..self.clone()
        }
    }

    pub fn is_synthetic_bookmark(&self, page: usize) -> bool {
        page == 0 || (self.page_count() > 1 && page == self.last_page())
    }

    /// Bookmarks without the synthetic start and end entries.
    pub fn user_bookmarks(&self) -> Vec<usize> {
        self.bookmarks
            .iter()
            .copied()
            .filter(|&bm| !self.is_synthetic_bookmark(bm))
            .collect()
    }

    /// Returns a settled book to INITIAL so it can be parsed again.
    pub fn reset_for_reload(&self) -> Self {
        match self.status {
            LoadStatus::Done | LoadStatus::Failed => {
                let user = self.user_bookmarks();
                Self {
                    pages: Arc::from(Vec::new()),
                    status: LoadStatus::Initial,
                    bookmarks: vec![0],
                    ..self.clone()
                }
                .with_bookmarks(user)
            }
            LoadStatus::Initial | LoadStatus::Loading => self.clone(),
        }
    }
}

fn normalize_bookmarks(bookmarks: &mut Vec<usize>) {
    bookmarks.sort_unstable();
    bookmarks.dedup();
}

/// Books keyed by path, iterated in the order they were discovered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Library {
    order: Vec<String>,
    books: HashMap<String, Arc<Book>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_books(books: impl IntoIterator<Item = Book>) -> Self {
        let mut library = Self::new();
        for book in books {
            library.insert(book);
        }
        library
    }

    /// Adds a book at the end, or replaces it in place when the path is known.
    pub fn insert(&mut self, book: impl Into<Arc<Book>>) {
        let book = book.into();
        if !self.books.contains_key(&book.path) {
            self.order.push(book.path.clone());
        }
        self.books.insert(book.path.clone(), book);
    }

    pub fn with_book(&self, book: impl Into<Arc<Book>>) -> Self {
        let mut library = self.clone();
        library.insert(book);
        library
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Book>> {
        self.books.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.books.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Book>> {
        self.order.iter().filter_map(|path| self.books.get(path))
    }

    pub fn paths(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// What the reader has selected, plus every book's reading state.
#[derive(Debug, Clone, PartialEq)]
pub struct UserState {
    pub books: Library,
    pub current_book: String,
    pub current_language: String,
}

impl UserState {
    pub fn current(&self) -> Option<&Arc<Book>> {
        self.books.get(&self.current_book)
    }
}
