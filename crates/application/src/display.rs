//! Keeps the physical rows in step with the rendered buffer, one row per tick.

use brailleshelf_core::Row;

use crate::driver::Driver;

#[derive(Debug, Clone)]
pub struct Display {
    buffer: Vec<Row>,
    hardware_state: Vec<Row>,
    row: usize,
    up_to_date: bool,
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl Display {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            hardware_state: Vec::new(),
            row: 0,
            up_to_date: true,
        }
    }

    /// Replaces the buffer and restarts the sweep. An identical buffer is
    /// ignored. Returns whether anything changed.
    pub fn set_buffer(&mut self, buffer: Vec<Row>) -> bool {
        if buffer == self.buffer {
            return false;
        }
        self.buffer = buffer;
        self.row = 0;
        self.up_to_date = false;
        true
    }

    /// Compares one row against the hardware mirror and writes it through
    /// `write` only if it differs. A failed write leaves the cursor in place
    /// so the row is retried on the next call.
    pub fn advance_one_row<F>(&mut self, mut write: F) -> anyhow::Result<()>
    where
        F: FnMut(usize, &Row) -> anyhow::Result<()>,
    {
        let row = self.row;
        if row >= self.buffer.len() {
            self.up_to_date = true;
            return Ok(());
        }
        if row >= self.hardware_state.len() {
            self.hardware_state.resize(row + 1, Row::default());
        }
        let wanted = &self.buffer[row];
        if *wanted != self.hardware_state[row] {
            write(row, wanted)?;
            self.hardware_state[row] = wanted.clone();
        }
        self.row += 1;
        Ok(())
    }

    pub fn send_line(&mut self, driver: &mut impl Driver) -> anyhow::Result<()> {
        self.advance_one_row(|index, row| driver.set_braille_row(index, row))
    }

    pub fn is_up_to_date(&self) -> bool {
        self.up_to_date
    }

    pub fn buffer(&self) -> &[Row] {
        &self.buffer
    }

    pub fn hardware_state(&self) -> &[Row] {
        &self.hardware_state
    }

    pub fn cursor(&self) -> usize {
        self.row
    }

    /// Forgets what the hardware shows, e.g. after a display reset, so the
    /// next sweep rewrites every row.
    pub fn reset_hardware_state(&mut self) {
        self.hardware_state.clear();
        self.row = 0;
        self.up_to_date = self.buffer.is_empty();
    }
}
