use brailleshelf_application::Driver;
use brailleshelf_core::{Dimensions, Row};
use log::info;

/// Headless stand-in for the hardware: row writes go to the log.
#[derive(Debug)]
pub struct DummyDriver {
    dimensions: Dimensions,
}

impl DummyDriver {
    pub fn new(dimensions: Dimensions) -> Self {
        Self { dimensions }
    }
}

impl Driver for DummyDriver {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn set_braille_row(&mut self, index: usize, row: &Row) -> anyhow::Result<()> {
        if index >= self.dimensions.height {
            anyhow::bail!("row {index} is outside a {}-row display", self.dimensions.height);
        }
        info!("row {index}: {}", row.to_unicode());
        Ok(())
    }
}
