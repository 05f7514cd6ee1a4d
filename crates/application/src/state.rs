use brailleshelf_core::Dimensions;
pub use brailleshelf_core::UserState;

/// Progress of the background pass that loads the whole library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadBooks {
    #[default]
    Idle,
    Start,
    Loading,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub user: UserState,
    pub load_books: LoadBooks,
    pub dimensions: Dimensions,
    pub shutting_down: bool,
}

impl AppState {
    pub fn new(user: UserState, dimensions: Dimensions) -> Self {
        Self {
            user,
            load_books: LoadBooks::Idle,
            dimensions,
            shutting_down: false,
        }
    }
}
