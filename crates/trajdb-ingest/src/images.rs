// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Camera frame metadata.
//!
//! Frame dumps are named `<prefix>_<epoch seconds>.<ext>`, for example
//! `frame_1699999999.5.png`. Only the file name is inspected; image contents
//! are never opened.

use crate::timestamp::{EpochInstant, TimestampError};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Extensions recognised as camera frames (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Why a file name was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImageNameError {
    #[error("not an image file: {0:?}")]
    UnsupportedExtension(String),

    #[error("file name is not valid UTF-8: {0:?}")]
    NonUtf8Name(String),

    #[error("no timestamp in file name {name:?}: {source}")]
    BadTimestamp {
        name: String,
        source: TimestampError,
    },
}

/// One camera frame row.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub instant: EpochInstant,
    pub camera: String,
    pub path: PathBuf,
    pub bag_file: String,
}

/// Extract the capture instant from a frame file name.
pub fn parse_image_timestamp(file_name: &str) -> Result<EpochInstant, ImageNameError> {
    let (stem, _) = file_name
        .rsplit_once('.')
        .filter(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .ok_or_else(|| ImageNameError::UnsupportedExtension(file_name.to_string()))?;

    let token = stem.rsplit('_').next().unwrap_or(stem);
    EpochInstant::parse_secs(token).map_err(|source| ImageNameError::BadTimestamp {
        name: file_name.to_string(),
        source,
    })
}

/// Result of scanning one image directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageScan {
    pub records: Vec<ImageRecord>,
    pub skipped: Vec<(String, ImageNameError)>,
}

/// List `dir` and build a record for every parseable frame.
///
/// Entries are visited in file-name order; sub-directories are ignored.
pub fn scan_image_dir(dir: &Path, camera: &str, bag_file: &str) -> io::Result<ImageScan> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort();

    let mut scan = ImageScan::default();
    for path in entries {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let name = match file_name.to_str() {
            Some(name) => name.to_string(),
            None => {
                let lossy = file_name.to_string_lossy().into_owned();
                debug!("Skipping {:?}: not valid UTF-8", lossy);
                scan.skipped.push((lossy.clone(), ImageNameError::NonUtf8Name(lossy)));
                continue;
            }
        };
        match parse_image_timestamp(&name) {
            Ok(instant) => scan.records.push(ImageRecord {
                instant,
                camera: camera.to_string(),
                path,
                bag_file: bag_file.to_string(),
            }),
            Err(e) => {
                debug!("Skipping '{}': {}", name, e);
                scan.skipped.push((name, e));
            }
        }
    }

    Ok(scan)
}
