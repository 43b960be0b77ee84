//! # Persistence Helpers
//!
//! Whole-document JSON reads and writes shared by the profile store and the
//! config. Documents are always rewritten in full; there is no patching and
//! no file locking, so the last writer wins.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Serializes `document` as pretty JSON and overwrites `path`.
///
/// The parent directory is created if missing.
pub fn write_json<T: Serialize>(document: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    let json_string =
        serde_json::to_string_pretty(document).context("serializing document")?;
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    file.write_all(json_string.as_bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Reads `path` and deserializes it as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut data = String::new();
    file.read_to_string(&mut data)
        .with_context(|| format!("reading {}", path.display()))?;
    let document = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(document)
}
