//! Startup, reading and restart flows across the crates.

use std::path::Path;
use std::sync::Arc;

use brailleshelf_application::{Action, AppState, Button, Display, Scheduler, Store, render_book};
use brailleshelf_core::{Dimensions, LoadStatus, MANUAL_PATH, Row};
use brailleshelf_engine::Engine;
use brailleshelf_engine::braille::ascii_cell;
use brailleshelf_storage::{ReadingStateStore, SystemMounts};

use crate::{RecordingDriver, make_config, pef_document, write_book};

fn dims() -> Dimensions {
    Dimensions {
        width: 4,
        height: 2,
    }
}

fn text_row(text: &str) -> Row {
    Row::fitted(text.chars().map(ascii_cell).collect(), dims().width)
}

struct Device {
    reading_state: Arc<ReadingStateStore<SystemMounts>>,
    store: Store,
    scheduler: Scheduler<Engine>,
    display: Display,
    driver: RecordingDriver,
}

impl Device {
    fn boot(media: &Path) -> Self {
        let config = make_config(media, dims());
        let mounts = SystemMounts::from_config(&config);
        let reading_state = Arc::new(ReadingStateStore::new(config, mounts));
        let engine = Engine::new();
        let user = reading_state.read(engine.manual(dims()), dims());
        let store = Store::new(AppState::new(user, dims()));
        Self {
            reading_state,
            scheduler: Scheduler::new(store.clone(), engine),
            store,
            display: Display::new(),
            driver: RecordingDriver::new(dims()),
        }
    }

    async fn refresh(&mut self) -> Vec<Row> {
        let rows = render_book(&self.store.state(), &self.scheduler).await;
        self.display.set_buffer(rows.clone());
        rows
    }

    fn sync(&mut self) {
        let mut ticks = 0;
        while !self.display.is_up_to_date() {
            self.display.send_line(&mut self.driver).ok();
            ticks += 1;
            assert!(ticks < 100, "display never settled");
        }
    }

    fn press(&mut self, button: Button) -> bool {
        self.store.dispatch(button.action())
    }
}

#[tokio::test]
async fn opening_a_book_fills_the_display() -> anyhow::Result<()> {
    let media = tempfile::tempdir()?;
    let path = write_book(media.path(), "sd-card/story.brf", "A\nB\nA\nC\nD\n")?;
    let mut device = Device::boot(media.path());
    assert_eq!(device.store.state().user.current_book, MANUAL_PATH);

    assert!(device.store.dispatch(Action::SetCurrentBook(path.clone())));
    let rows = device.refresh().await;
    device.sync();
    assert_eq!(rows, vec![text_row("A"), text_row("B")]);
    assert_eq!(device.driver.rows, rows);
    assert_eq!(
        device.store.book(&path).map(|book| book.status),
        Some(LoadStatus::Done)
    );

    device.driver.writes.clear();
    assert!(device.press(Button::Forward));
    device.refresh().await;
    device.sync();
    assert_eq!(device.driver.rows, vec![text_row("A"), text_row("C")]);
    assert_eq!(device.driver.writes, vec![1]);
    Ok(())
}

#[tokio::test]
async fn failed_row_write_is_retried() -> anyhow::Result<()> {
    let media = tempfile::tempdir()?;
    let mut device = Device::boot(media.path());
    let rows = device.refresh().await;

    device.driver.fail_next(1);
    assert!(device.display.send_line(&mut device.driver).is_err());
    device.sync();
    assert_eq!(device.driver.rows, rows);
    Ok(())
}

#[tokio::test]
async fn progress_survives_a_restart() -> anyhow::Result<()> {
    let media = tempfile::tempdir()?;
    let path = write_book(media.path(), "usb1/story.brf", "A\nB\nA\nC\nD\n")?;

    let mut device = Device::boot(media.path());
    device.store.dispatch(Action::SetCurrentBook(path.clone()));
    device.refresh().await;
    device.press(Button::Forward);
    device.press(Button::Bookmark);
    device.store.dispatch(Action::SetLanguage("de".to_string()));
    device
        .reading_state
        .write(&device.store.state().user)
        .await;
    assert_eq!(device.reading_state.writes_in_flight(), 0);

    let mut rebooted = Device::boot(media.path());
    let state = rebooted.store.state();
    assert_eq!(state.user.current_book, path);
    assert_eq!(state.user.current_language, "de");
    let book = rebooted.store.book(&path).expect("book");
    assert_eq!(book.page_index, 1);
    assert_eq!(book.bookmarks, vec![0, 1]);

    let rows = rebooted.refresh().await;
    assert_eq!(rows, vec![text_row("A"), text_row("C")]);
    assert_eq!(
        rebooted.store.book(&path).map(|book| book.bookmarks.clone()),
        Some(vec![0, 1, 2])
    );
    Ok(())
}

#[tokio::test]
async fn moved_usb_stick_keeps_the_current_book() -> anyhow::Result<()> {
    let media = tempfile::tempdir()?;
    let first = write_book(media.path(), "usb1/story.brf", "A\n")?;
    let mut device = Device::boot(media.path());
    device.store.dispatch(Action::SetCurrentBook(first.clone()));
    device
        .reading_state
        .write(&device.store.state().user)
        .await;

    std::fs::rename(media.path().join("usb1"), media.path().join("usb2"))?;
    let rebooted = Device::boot(media.path());
    let moved = media.path().join("usb2/story.brf");
    assert_eq!(
        rebooted.store.state().user.current_book,
        moved.to_string_lossy()
    );
    Ok(())
}

#[tokio::test]
async fn background_pass_settles_every_book() -> anyhow::Result<()> {
    let media = tempfile::tempdir()?;
    let good = write_book(
        media.path(),
        "sd-card/good.pef",
        &pef_document(&[&["\u{2801}", "\u{2803}"], &["\u{2809}"]]),
    )?;
    let empty = write_book(media.path(), "sd-card/empty.brf", "")?;
    let broken = write_book(media.path(), "sd-card/broken.pef", "<pef><body>")?;
    let mut device = Device::boot(media.path());

    assert!(device.store.dispatch(Action::RequestLoadBooks));
    device.scheduler.fully_load_books().await;

    let status = |path: &str| device.store.book(path).map(|book| book.status);
    assert_eq!(status(MANUAL_PATH), Some(LoadStatus::Done));
    assert_eq!(status(&good), Some(LoadStatus::Done));
    assert_eq!(status(&empty), Some(LoadStatus::Failed));
    assert_eq!(status(&broken), Some(LoadStatus::Failed));
    assert_eq!(device.store.book(&good).map(|book| book.page_count()), Some(2));

    device.store.dispatch(Action::SetCurrentBook(empty.clone()));
    let rows = device.refresh().await;
    assert!(rows.iter().all(Row::is_blank));
    assert_eq!(rows.len(), dims().height);

    assert!(device.store.dispatch(Action::ReloadBook(empty.clone())));
    assert_eq!(
        device.store.book(&empty).map(|book| book.status),
        Some(LoadStatus::Initial)
    );
    Ok(())
}
