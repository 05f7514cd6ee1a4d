use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 40,
            height: 9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media_dir: String,
    pub sd_card_dir: String,
    pub additional_lib_1: Option<String>,
    pub additional_lib_2: Option<String>,
    pub state_file: String,
    pub state_prefix: String,
    pub require_mount: bool,
    pub default_language: String,
    pub dimensions: Dimensions,
}

/// A removable-media directory books are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    pub path: PathBuf,
    pub label: &'static str,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_dir: "/media".to_string(),
            sd_card_dir: "sd-card".to_string(),
            additional_lib_1: None,
            additional_lib_2: None,
            state_file: "brailleshelf_state.txt".to_string(),
            state_prefix: "brailleshelf.".to_string(),
            require_mount: true,
            default_language: "en-gb".to_string(),
            dimensions: Dimensions::default(),
        }
    }
}

impl Config {
    pub fn normalize(&mut self) {
        self.dimensions.width = self.dimensions.width.max(1);
        self.dimensions.height = self.dimensions.height.max(1);
        for lib in [&mut self.additional_lib_1, &mut self.additional_lib_2] {
            if lib.as_deref().is_some_and(|dir| dir.trim().is_empty()) {
                *lib = None;
            }
        }
        if self.default_language.trim().is_empty() {
            self.default_language = Config::default().default_language;
        }
    }

    pub fn media_path(&self) -> PathBuf {
        PathBuf::from(&self.media_dir)
    }

    /// Configured source roots in lookup order: SD card, then USB slots.
    pub fn source_roots(&self) -> Vec<SourceRoot> {
        let media = self.media_path();
        let mut roots = vec![SourceRoot {
            path: media.join(&self.sd_card_dir),
            label: "SD",
        }];
        if let Some(dir) = &self.additional_lib_1 {
            roots.push(SourceRoot {
                path: media.join(dir),
                label: "USB1",
            });
        }
        if let Some(dir) = &self.additional_lib_2 {
            roots.push(SourceRoot {
                path: media.join(dir),
                label: "USB2",
            });
        }
        roots
    }

    /// The two USB roots a book may move between, when both are configured.
    pub fn swappable_roots(&self) -> Option<(PathBuf, PathBuf)> {
        let media = self.media_path();
        match (&self.additional_lib_1, &self.additional_lib_2) {
            (Some(a), Some(b)) => Some((media.join(a), media.join(b))),
            _ => None,
        }
    }
}
