//! Test helpers and fixtures.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use brailleshelf_application::{Button, Driver};
use brailleshelf_core::{Config, Dimensions, Row};

#[cfg(test)]
mod scenarios;

/// A media directory with the SD card and both USB slots configured and no
/// mount-point requirement.
pub fn make_config(media: &Path, dimensions: Dimensions) -> Config {
    Config {
        media_dir: media.to_string_lossy().into_owned(),
        additional_lib_1: Some("usb1".to_string()),
        additional_lib_2: Some("usb2".to_string()),
        require_mount: false,
        dimensions,
        ..Config::default()
    }
}

/// Writes a book under `media` and returns its library path.
pub fn write_book(media: &Path, relative: &str, contents: &str) -> anyhow::Result<String> {
    let path = media.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path.to_string_lossy().into_owned())
}

/// A minimal PEF document, one `page` per entry.
pub fn pef_document(pages: &[&[&str]]) -> String {
    let mut body = String::new();
    for rows in pages {
        body.push_str("<page>");
        for row in *rows {
            body.push_str("<row>");
            body.push_str(row);
            body.push_str("</row>");
        }
        body.push_str("</page>");
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <pef version=\"2008-1\" xmlns=\"http://www.daisy.org/ns/2008/pef\">\
         <body><volume><section>{body}</section></volume></body></pef>"
    )
}

/// Driver that remembers every row write and replays queued buttons.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    pub dimensions: Dimensions,
    pub rows: Vec<Row>,
    pub writes: Vec<usize>,
    pub buttons: VecDeque<Button>,
    pub failures: usize,
}

impl RecordingDriver {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            rows: vec![Row::blank(dimensions.width); dimensions.height],
            ..Self::default()
        }
    }

    /// Makes the next `count` row writes fail.
    pub fn fail_next(&mut self, count: usize) {
        self.failures = count;
    }
}

impl Driver for RecordingDriver {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn set_braille_row(&mut self, index: usize, row: &Row) -> anyhow::Result<()> {
        if self.failures > 0 {
            self.failures -= 1;
            anyhow::bail!("row {index} write failed");
        }
        let Some(slot) = self.rows.get_mut(index) else {
            anyhow::bail!("row {index} out of range");
        };
        *slot = row.clone();
        self.writes.push(index);
        Ok(())
    }

    fn poll_button(&mut self) -> anyhow::Result<Option<Button>> {
        Ok(self.buttons.pop_front())
    }

    fn reset_display(&mut self) -> anyhow::Result<()> {
        self.rows = vec![Row::blank(self.dimensions.width); self.dimensions.height];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_config() {
        let dims = Dimensions {
            width: 6,
            height: 3,
        };
        let config = make_config(Path::new("/tmp/media"), dims);
        assert_eq!(config.dimensions, dims);
        assert_eq!(config.source_roots().len(), 3);
    }

    #[test]
    fn recording_driver_fails_on_request() {
        let mut driver = RecordingDriver::new(Dimensions {
            width: 2,
            height: 2,
        });
        driver.fail_next(1);
        assert!(driver.set_braille_row(0, &Row::blank(2)).is_err());
        assert!(driver.set_braille_row(0, &Row::blank(2)).is_ok());
        assert!(driver.set_braille_row(5, &Row::blank(2)).is_err());
        assert_eq!(driver.writes, vec![0]);
    }
}
