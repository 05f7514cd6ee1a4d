use brailleshelf_core::{Dimensions, Row};

use crate::store::Action;

/// The hardware boundary: the only way rows reach the display.
pub trait Driver {
    fn dimensions(&self) -> Dimensions;

    fn set_braille_row(&mut self, index: usize, row: &Row) -> anyhow::Result<()>;

    /// Next pressed button, if any. Never blocks.
    fn poll_button(&mut self) -> anyhow::Result<Option<Button>> {
        Ok(None)
    }

    /// False once the device (or emulator window) has gone away.
    fn is_ok(&self) -> bool {
        true
    }

    fn reset_display(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Forward,
    Back,
    Bookmark,
    Quit,
}

impl Button {
    pub fn action(self) -> Action {
        match self {
            Button::Forward => Action::NextPage,
            Button::Back => Action::PreviousPage,
            Button::Bookmark => Action::InsertBookmark,
            Button::Quit => Action::Shutdown,
        }
    }
}
