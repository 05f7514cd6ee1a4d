//! Reading progress and the current selection, stored as small TOML records
//! next to the books they describe.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context as _;
use brailleshelf_core::{Book, Config, Dimensions, Library, MANUAL_PATH, UserState};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, watch};

use crate::library::{MountProbe, scan_books};

/// Per-book record. Pages are one-based on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    pub current_page: usize,
    pub bookmarks: Vec<usize>,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            current_page: 1,
            bookmarks: Vec::new(),
        }
    }
}

impl ProgressRecord {
    pub fn from_book(book: &Book) -> Self {
        Self {
            current_page: book.page_index + 1,
            bookmarks: book.user_bookmarks().iter().map(|bm| bm + 1).collect(),
        }
    }

    pub fn apply_to(&self, book: &Book) -> Book {
        book.with_page_index(self.current_page.saturating_sub(1))
            .with_bookmarks(self.bookmarks.iter().map(|bm| bm.saturating_sub(1)))
    }
}

/// The global record kept at the top of every mounted source root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionRecord {
    pub current_book: Option<String>,
    pub current_language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Snapshot {
    current_book: String,
    current_language: String,
    books: HashMap<String, ProgressRecord>,
}

pub struct ReadingStateStore<M> {
    config: Config,
    mounts: M,
    permit: Semaphore,
    in_flight: watch::Sender<usize>,
    last_written: Mutex<Snapshot>,
}

impl<M: MountProbe> ReadingStateStore<M> {
    pub fn new(config: Config, mounts: M) -> Self {
        Self {
            config,
            mounts,
            permit: Semaphore::new(1),
            in_flight: watch::Sender::new(0),
            last_written: Mutex::new(Snapshot::default()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn mounted_roots(&self) -> Vec<PathBuf> {
        self.config
            .source_roots()
            .into_iter()
            .filter(|root| self.mounts.is_mounted(&root.path))
            .map(|root| root.path)
            .collect()
    }

    /// Where the record for `book_path` lives: beside the book, named after
    /// its file. The manual's record sits in the media directory.
    pub fn record_path(&self, book_path: &str) -> PathBuf {
        let prefix = &self.config.state_prefix;
        if book_path == MANUAL_PATH {
            return self
                .config
                .media_path()
                .join(format!("{prefix}{MANUAL_PATH}.txt"));
        }
        let path = Path::new(book_path);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        dir.join(format!("{prefix}{name}.txt"))
    }

    /// Builds the startup state: the manual plus every discovered book, each
    /// with its saved progress, and the saved selection. Unreadable records
    /// are logged and fall back to defaults.
    pub fn read(&self, manual: Book, dimensions: Dimensions) -> UserState {
        let selection = self.read_selection();
        let saved_book = selection
            .current_book
            .as_deref()
            .map(|book| self.absolute_book_path(book))
            .unwrap_or_else(|| MANUAL_PATH.to_string());
        let current_language = selection
            .current_language
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or_else(|| self.config.default_language.clone());

        let mut records = HashMap::new();
        let mut books = Library::new();
        let paths = scan_books(&self.config, &self.mounts);
        let discovered = paths.iter().map(|path| Book::new(path.as_str(), dimensions));
        for book in std::iter::once(manual).chain(discovered) {
            let record = self.read_progress(&book.path);
            let book = match &record {
                Some(record) => record.apply_to(&book),
                None => book,
            };
            records.insert(book.path.clone(), ProgressRecord::from_book(&book));
            books.insert(book);
        }

        let current_book = self.reconcile(&saved_book, &books);
        *self.lock_snapshot() = Snapshot {
            current_book: saved_book,
            current_language: current_language.clone(),
            books: records,
        };

        UserState {
            books,
            current_book,
            current_language,
        }
    }

    fn read_selection(&self) -> SelectionRecord {
        for root in self.mounted_roots() {
            let path = root.join(&self.config.state_file);
            match read_record::<SelectionRecord>(&path) {
                Ok(Some(selection)) => {
                    info!("reading state from {}", path.display());
                    return selection;
                }
                Ok(None) => {}
                Err(err) => warn!("{err:#}"),
            }
        }
        SelectionRecord::default()
    }

    fn read_progress(&self, book_path: &str) -> Option<ProgressRecord> {
        let path = self.record_path(book_path);
        match read_record(&path) {
            Ok(record) => record,
            Err(err) => {
                warn!("{err:#}");
                None
            }
        }
    }

    /// Falls back to the same book under the other USB slot when a stick
    /// was moved, then to the manual.
    fn reconcile(&self, current: &str, books: &Library) -> String {
        if books.contains(current) {
            return current.to_string();
        }
        info!("current book {current} not in library");
        if let Some(swapped) = self.swapped_path(current) {
            if books.contains(&swapped) {
                info!("found current book in other usb slot: {swapped}");
                return swapped;
            }
        }
        warn!("current book {current} not found, showing manual");
        MANUAL_PATH.to_string()
    }

    fn swapped_path(&self, book: &str) -> Option<String> {
        let (lib1, lib2) = self.config.swappable_roots()?;
        let path = Path::new(book);
        let swapped = if let Ok(rest) = path.strip_prefix(&lib1) {
            lib2.join(rest)
        } else if let Ok(rest) = path.strip_prefix(&lib2) {
            lib1.join(rest)
        } else {
            return None;
        };
        Some(swapped.to_string_lossy().into_owned())
    }

    fn absolute_book_path(&self, stored: &str) -> String {
        if stored == MANUAL_PATH {
            return stored.to_string();
        }
        self.config
            .media_path()
            .join(stored)
            .to_string_lossy()
            .into_owned()
    }

    fn relative_book_path(&self, book: &str) -> String {
        if book == MANUAL_PATH {
            return book.to_string();
        }
        let media = self.config.media_path();
        match Path::new(book).strip_prefix(&media) {
            Ok(rest) => rest.to_string_lossy().into_owned(),
            Err(_) => book.to_string(),
        }
    }

    pub fn writes_in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    fn begin_write(&self) {
        self.in_flight.send_modify(|count| *count += 1);
    }

    fn end_write(&self) {
        self.in_flight.send_modify(|count| *count = count.saturating_sub(1));
    }

    /// Persists whatever changed since the last pass. Passes never overlap.
    pub async fn write(&self, user: &UserState) {
        self.begin_write();
        self.write_pass(user).await;
        self.end_write();
    }

    /// Like `write`, but counts the pass as in flight immediately so it can
    /// be spawned and awaited later.
    pub fn queue_write(self: &Arc<Self>, user: UserState) -> impl Future<Output = ()> + use<M> {
        self.begin_write();
        let this = Arc::clone(self);
        async move {
            this.write_pass(&user).await;
            this.end_write();
        }
    }

    /// Resolves once no write pass is queued or running.
    pub async fn flush(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    async fn write_pass(&self, user: &UserState) {
        // Semaphore is never closed.
        let Ok(_permit) = self.permit.acquire().await else {
            return;
        };
        let previous = self.lock_snapshot().clone();
        let mut written = Snapshot {
            current_book: user.current_book.clone(),
            current_language: user.current_language.clone(),
            books: HashMap::with_capacity(user.books.len()),
        };

        if previous.current_book != written.current_book
            || previous.current_language != written.current_language
        {
            let record = SelectionRecord {
                current_book: Some(self.relative_book_path(&user.current_book)),
                current_language: Some(user.current_language.clone()),
            };
            for root in self.mounted_roots() {
                let path = root.join(&self.config.state_file);
                if let Err(err) = write_record(&path, &record).await {
                    warn!("{err:#}");
                }
            }
        }

        for book in user.books.iter() {
            let record = ProgressRecord::from_book(book);
            let before = previous.books.get(&book.path).cloned().unwrap_or_default();
            let kept = if record == before {
                record
            } else {
                match write_record(&self.record_path(&book.path), &record).await {
                    Ok(()) => record,
                    Err(err) => {
                        warn!("{err:#}");
                        before
                    }
                }
            };
            written.books.insert(book.path.clone(), kept);
        }

        *self.lock_snapshot() = written;
    }

    fn lock_snapshot(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_record<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<Option<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("read state {}", path.display()));
        }
    };
    let record =
        toml::from_str(&text).with_context(|| format!("parse state {}", path.display()))?;
    Ok(Some(record))
}

async fn write_record<T: Serialize>(path: &Path, record: &T) -> anyhow::Result<()> {
    let text = toml::to_string(record)
        .with_context(|| format!("serialize state {}", path.display()))?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("write state {}", path.display()))
}
