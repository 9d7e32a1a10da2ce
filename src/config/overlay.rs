// src/config/overlay.rs

//! Merging `key=value` command-line tokens with env-format files.
//!
//! Tokens are applied first and the file is merged afterwards into the same
//! map, so a key set by both ends up with the file's value.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::errors::{FlowrunError, Result};
use crate::fs::FileSystem;

pub type KeyValueMap = BTreeMap<String, String>;

/// Split `key=value` on the first `=`; a bare `key` maps to "".
fn split_token(token: &str) -> (&str, &str) {
    token.split_once('=').unwrap_or((token, ""))
}

/// Apply `key=value` / `key` tokens to `map`. Returns true if any token was
/// given.
pub fn parse_key_values<S: AsRef<str>>(tokens: &[S], map: &mut KeyValueMap) -> bool {
    for token in tokens {
        let (key, value) = split_token(token.as_ref());
        map.insert(key.to_string(), value.to_string());
    }
    !tokens.is_empty()
}

/// Apply secret tokens to `map`.
///
/// Keys are upper-cased. A bare key takes its value from the environment
/// variable of the same name, or "" when that is unset.
pub fn parse_secrets<S: AsRef<str>>(tokens: &[S], map: &mut KeyValueMap) {
    for token in tokens {
        let token = token.as_ref();
        match token.split_once('=') {
            Some((key, value)) => {
                map.insert(key.to_uppercase(), value.to_string());
            }
            None => {
                let value = std::env::var(token).unwrap_or_default();
                map.insert(token.to_uppercase(), value);
            }
        }
    }
}

/// Apply `label=image` platform tokens. Labels are lower-cased and later
/// tokens win.
pub fn parse_platforms<S: AsRef<str>>(tokens: &[S]) -> KeyValueMap {
    let mut map = KeyValueMap::new();
    for token in tokens {
        let (label, image) = split_token(token.as_ref());
        map.insert(label.to_lowercase(), image.to_string());
    }
    map
}

/// Merge a dotenv-format file into `map`, overwriting existing keys.
///
/// Returns `Ok(false)` when the file does not exist. A malformed file is an
/// error.
pub fn read_env_file(fs: &dyn FileSystem, path: &Path, map: &mut KeyValueMap) -> Result<bool> {
    if !fs.exists(path) {
        debug!(path = ?path, "env file not present; nothing to overlay");
        return Ok(false);
    }

    let contents = fs.read_to_string(path)?;
    for item in dotenvy::from_read_iter(contents.as_bytes()) {
        let (key, value) = item.map_err(|source| FlowrunError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        map.insert(key, value);
    }

    debug!(path = ?path, "loaded env file");
    Ok(true)
}

/// Tokens first, then the file: the common env/input overlay.
pub fn overlay<S: AsRef<str>>(
    fs: &dyn FileSystem,
    tokens: &[S],
    path: &Path,
) -> Result<KeyValueMap> {
    let mut map = KeyValueMap::new();
    parse_key_values(tokens, &mut map);
    read_env_file(fs, path, &mut map)?;
    Ok(map)
}
