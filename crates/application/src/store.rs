//! Snapshot store: every action replaces the whole `AppState`.

use std::sync::Arc;

use brailleshelf_core::{Book, LoadStatus};
use tokio::sync::watch;

use crate::state::{AppState, LoadBooks};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// INITIAL -> LOADING; ignored for a book in any other status.
    SetBookLoading(String),
    AddOrReplace(Arc<Book>),
    RequestLoadBooks,
    StartLoadBooks,
    CancelLoadBooks,
    LoadBooksFinished,
    SetCurrentBook(String),
    SetLanguage(String),
    GoToPage(usize),
    NextPage,
    PreviousPage,
    InsertBookmark,
    DeleteBookmark(usize),
    ReloadBook(String),
    Shutdown,
}

/// The next state, or `None` when the action changes nothing.
pub fn reduce(state: &AppState, action: &Action) -> Option<AppState> {
    match action {
        Action::SetBookLoading(path) => {
            let book = state.user.books.get(path)?;
            if book.status != LoadStatus::Initial {
                return None;
            }
            Some(replace_book(state, book.with_status(LoadStatus::Loading)))
        }
        Action::AddOrReplace(book) => Some(replace_book(state, Arc::clone(book))),
        Action::RequestLoadBooks => (state.load_books == LoadBooks::Idle)
            .then(|| with_load_books(state, LoadBooks::Start)),
        Action::StartLoadBooks => (state.load_books == LoadBooks::Start)
            .then(|| with_load_books(state, LoadBooks::Loading)),
        Action::CancelLoadBooks => match state.load_books {
            LoadBooks::Loading => Some(with_load_books(state, LoadBooks::Cancel)),
            LoadBooks::Start => Some(with_load_books(state, LoadBooks::Idle)),
            LoadBooks::Idle | LoadBooks::Cancel => None,
        },
        Action::LoadBooksFinished => (state.load_books != LoadBooks::Idle)
            .then(|| with_load_books(state, LoadBooks::Idle)),
        Action::SetCurrentBook(path) => {
            if !state.user.books.contains(path) || state.user.current_book == *path {
                return None;
            }
            let mut next = state.clone();
            next.user.current_book = path.clone();
            Some(next)
        }
        Action::SetLanguage(code) => {
            if state.user.current_language == *code {
                return None;
            }
            let mut next = state.clone();
            next.user.current_language = code.clone();
            Some(next)
        }
        Action::GoToPage(page) => update_current(state, |book| book.with_page_index(*page)),
        Action::NextPage => update_current(state, |book| {
            if book.is_loaded() && book.page_index < book.last_page() {
                book.with_page_index(book.page_index + 1)
            } else {
                book.clone()
            }
        }),
        Action::PreviousPage => update_current(state, |book| {
            book.with_page_index(book.page_index.saturating_sub(1))
        }),
        Action::InsertBookmark => {
            update_current(state, |book| book.with_bookmark(book.page_index))
        }
        Action::DeleteBookmark(page) => update_current(state, |book| book.without_bookmark(*page)),
        Action::ReloadBook(path) => {
            let book = state.user.books.get(path)?;
            let reset = book.reset_for_reload();
            if reset == **book {
                return None;
            }
            Some(replace_book(state, reset))
        }
        Action::Shutdown => (!state.shutting_down).then(|| AppState {
            shutting_down: true,
            ..state.clone()
        }),
    }
}

fn replace_book(state: &AppState, book: impl Into<Arc<Book>>) -> AppState {
    let mut next = state.clone();
    next.user.books = state.user.books.with_book(book);
    next
}

fn with_load_books(state: &AppState, load_books: LoadBooks) -> AppState {
    AppState {
        load_books,
        ..state.clone()
    }
}

fn update_current(state: &AppState, f: impl FnOnce(&Book) -> Book) -> Option<AppState> {
    let book = state.user.current()?;
    let next = f(book);
    if next == **book {
        return None;
    }
    Some(replace_book(state, next))
}

/// Holds the latest published `AppState`; readers clone the `Arc` and never
/// observe a half-applied action.
#[derive(Debug, Clone)]
pub struct Store {
    tx: Arc<watch::Sender<Arc<AppState>>>,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(state));
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.tx.borrow().clone()
    }

    pub fn book(&self, path: &str) -> Option<Arc<Book>> {
        self.tx.borrow().user.books.get(path).cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.tx.subscribe()
    }

    /// Applies the action. Returns whether the state changed; subscribers are
    /// only notified when it did.
    pub fn dispatch(&self, action: Action) -> bool {
        self.tx.send_if_modified(|state| match reduce(state, &action) {
            Some(next) => {
                *state = Arc::new(next);
                true
            }
            None => false,
        })
    }

    /// Atomically claims a book for parsing. Only one caller wins per load.
    pub fn try_begin_loading(&self, path: &str) -> bool {
        self.dispatch(Action::SetBookLoading(path.to_string()))
    }
}
