//! Application orchestration layer for brailleshelf.

pub mod display;
pub mod driver;
pub mod render;
pub mod scheduler;
pub mod state;
pub mod store;

pub use display::Display;
pub use driver::{Button, Driver};
pub use render::render_book;
pub use scheduler::Scheduler;
pub use state::{AppState, LoadBooks, UserState};
pub use store::{Action, Store, reduce};
