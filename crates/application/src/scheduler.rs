//! Decides when books get parsed: on demand for the page being viewed, or
//! in a cancellable background pass over the whole library.

use std::sync::Arc;

use brailleshelf_core::{Book, LoadStatus, Page};
use brailleshelf_engine::{LoadMode, PageLoader};
use log::info;

use crate::state::LoadBooks;
use crate::store::{Action, Store};

#[derive(Debug)]
pub struct Scheduler<L> {
    store: Store,
    loader: L,
}

impl<L: PageLoader> Scheduler<L> {
    pub fn new(store: Store, loader: L) -> Self {
        Self { store, loader }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The requested page (default: the book's current page), loading the
    /// book first if needed. Indices past the end clamp to the last page;
    /// a book that failed to load shows a blank page.
    pub async fn get_page(&self, book: &Book, page_index: Option<usize>) -> Page {
        let page_index = page_index.unwrap_or(book.page_index);
        let mut book = self
            .store
            .book(&book.path)
            .unwrap_or_else(|| Arc::new(book.clone()));

        if !book.is_loaded() {
            book = self.ensure_loaded(book).await;
        }

        match book.page(page_index) {
            Some(page) => page.clone(),
            None => Page::blank(book.dimensions),
        }
    }

    async fn ensure_loaded(&self, mut book: Arc<Book>) -> Arc<Book> {
        loop {
            match book.status {
                LoadStatus::Loading => {
                    book = self.wait_until_settled(book).await;
                }
                LoadStatus::Initial => {
                    if !self.store.try_begin_loading(&book.path) {
                        book = self.store.book(&book.path).unwrap_or(book);
                        if book.status == LoadStatus::Initial {
                            return book;
                        }
                        continue;
                    }
                    info!("quickly loading {}", book.path);
                    let loading = book.with_status(LoadStatus::Loading);
                    let loaded = Arc::new(self.loader.load(&loading, LoadMode::Fast).await);
                    self.store.dispatch(Action::AddOrReplace(Arc::clone(&loaded)));
                    return loaded;
                }
                LoadStatus::Done | LoadStatus::Failed => return book,
            }
        }
    }

    /// Waits for whoever is parsing `book` to publish, then returns the
    /// published snapshot.
    async fn wait_until_settled(&self, book: Arc<Book>) -> Arc<Book> {
        let mut rx = self.store.subscribe();
        let settled = rx
            .wait_for(|state| {
                state
                    .user
                    .books
                    .get(&book.path)
                    .is_none_or(|b| b.status != LoadStatus::Loading)
            })
            .await
            .ok()
            .and_then(|state| state.user.books.get(&book.path).cloned());
        settled.unwrap_or_else(|| book.with_status(LoadStatus::Failed).into())
    }

    /// One background pass over the library in discovery order. Runs only
    /// when a pass was requested and none is active; the cancellation flag
    /// is checked before each book, never in the middle of one.
    pub async fn fully_load_books(&self) {
        if !self.store.dispatch(Action::StartLoadBooks) {
            return;
        }
        let paths = self.store.state().user.books.paths().to_vec();
        info!("loading {} books in background", paths.len());

        for (i, path) in paths.iter().enumerate() {
            if self.store.state().load_books == LoadBooks::Cancel {
                info!("background loading of books cancelled");
                self.store.dispatch(Action::LoadBooksFinished);
                return;
            }
            let Some(book) = self.store.book(path) else {
                continue;
            };
            if book.status != LoadStatus::Initial || !self.store.try_begin_loading(path) {
                info!("{} skipping background loading of {}", i + 1, path);
                continue;
            }
            info!("{} loading {} in background", i + 1, path);
            let loading = book.with_status(LoadStatus::Loading);
            let loaded = self.loader.load(&loading, LoadMode::Background).await;
            self.store.dispatch(Action::AddOrReplace(Arc::new(loaded)));
        }

        self.store.dispatch(Action::LoadBooksFinished);
        info!("background loading of books done");
    }
}
