//! App-name normalization
//!
//! Collapses the many spellings of one application (`C:\Apps\Code.exe`,
//! `Code.exe`, `code`) into the single key the rule cache is indexed by.

use crate::constants::{EXECUTABLE_SUFFIXES, UNKNOWN_APP_KEY};

/// Canonical lookup key for a raw process or application identifier.
///
/// Keeps the basename, strips trailing executable suffixes, lowercases and
/// trims. Empty input maps to `"unknown"`. Total and idempotent.
pub fn normalize_app_name(raw: &str) -> String {
    let base = raw.trim().rsplit(['/', '\\']).next().unwrap_or_default();
    let mut key = base.trim().to_lowercase();

    loop {
        let trimmed_len = key.trim_end().len();
        key.truncate(trimmed_len);
        match EXECUTABLE_SUFFIXES.iter().find(|suffix| key.ends_with(*suffix)) {
            Some(suffix) => {
                let new_len = key.len() - suffix.len();
                key.truncate(new_len);
            }
            None => break,
        }
    }

    let key = key.trim();
    if key.is_empty() {
        UNKNOWN_APP_KEY.to_string()
    } else {
        key.to_string()
    }
}
