use brailleshelf_core::{Page, Row};
use brailleshelf_engine::PageLoader;

use crate::scheduler::Scheduler;
use crate::state::AppState;

/// The current page of the current book, one row per display line.
pub async fn render_book<L: PageLoader>(state: &AppState, scheduler: &Scheduler<L>) -> Vec<Row> {
    match state.user.current() {
        Some(book) => scheduler.get_page(book, None).await.into_rows(),
        None => Page::blank(state.dimensions).into_rows(),
    }
}
