//! The running device: state subscriber, button and display loop, shutdown.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use brailleshelf_application::{
    Action, AppState, Display, Driver, LoadBooks, Scheduler, Store, render_book,
};
use brailleshelf_core::Config;
use brailleshelf_engine::{Engine, PageLoader};
use brailleshelf_storage::{MountProbe, ReadingStateStore, SystemMounts};
use log::{info, warn};
use tokio::sync::watch;
use tokio::task::spawn_local;

const TICK: Duration = Duration::from_millis(1);

/// Runs until a quit button, Ctrl-C or a lost display, then flushes the
/// reading state.
/// Must be called inside a `LocalSet`.
pub async fn run(config: Config, driver: &mut impl Driver) -> anyhow::Result<()> {
    let dimensions = driver.dimensions();
    let mounts = SystemMounts::from_config(&config);
    let reading_state = Arc::new(ReadingStateStore::new(config, mounts));
    let engine = Engine::new();
    let user = reading_state.read(engine.manual(dimensions), dimensions);
    info!(
        "{} books, current {} ({})",
        user.books.len(),
        user.current_book,
        user.current_language
    );

    let store = Store::new(AppState::new(user, dimensions));
    let scheduler = Rc::new(Scheduler::new(store.clone(), engine));
    let display = Rc::new(RefCell::new(Display::new()));

    store.dispatch(Action::RequestLoadBooks);
    spawn_local(follow_state(
        store.subscribe(),
        Rc::clone(&scheduler),
        Rc::clone(&display),
        Arc::clone(&reading_state),
    ));
    let signal_store = store.clone();
    spawn_local(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_store.dispatch(Action::Shutdown);
        }
    });

    driver.reset_display()?;
    display.borrow_mut().reset_hardware_state();

    while !store.state().shutting_down {
        if !driver.is_ok() {
            warn!("display went away, shutting down");
            store.dispatch(Action::Shutdown);
            break;
        }
        if let Some(button) = driver.poll_button()? {
            store.dispatch(button.action());
        }
        if let Err(err) = display.borrow_mut().send_line(&mut *driver) {
            warn!("row write failed: {err:#}");
        }
        tokio::time::sleep(TICK).await;
    }

    info!("shutting down");
    store.dispatch(Action::CancelLoadBooks);
    reading_state.write(&store.state().user).await;
    reading_state.flush().await;
    Ok(())
}

/// Reacts to every published state: kicks off the background pass when one
/// was requested, re-renders, and queues a reading-state write.
async fn follow_state<L, M>(
    mut rx: watch::Receiver<Arc<AppState>>,
    scheduler: Rc<Scheduler<L>>,
    display: Rc<RefCell<Display>>,
    reading_state: Arc<ReadingStateStore<M>>,
) where
    L: PageLoader + 'static,
    M: MountProbe + 'static,
{
    loop {
        let state = rx.borrow_and_update().clone();
        if state.shutting_down {
            break;
        }
        if state.load_books == LoadBooks::Start {
            let scheduler = Rc::clone(&scheduler);
            spawn_local(async move { scheduler.fully_load_books().await });
        }

        let rows = render_book(&state, &scheduler).await;
        display.borrow_mut().set_buffer(rows);
        spawn_local(reading_state.queue_write(state.user.clone()));

        if rx.changed().await.is_err() {
            break;
        }
    }
}
