// src/config/locations.rs

use std::path::{Path, PathBuf};

use crate::errors::{FlowrunError, Result};

/// File name of the rc file looked up in every location.
pub const RC_FILE_NAME: &str = ".flowrunrc";

/// Ordered rc-file candidates, lowest precedence first.
///
/// 1. `$HOME/.flowrunrc`
/// 2. `$XDG_CONFIG_HOME/.flowrunrc` (or `$HOME/.config/.flowrunrc`)
/// 3. `./.flowrunrc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocations {
    paths: Vec<PathBuf>,
}

impl ConfigLocations {
    /// Build the candidate list from the current user environment.
    pub fn discover() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            FlowrunError::Config("could not determine home directory".to_string())
        })?;
        let xdg = std::env::var("XDG_CONFIG_HOME").ok();
        Ok(Self::for_home(&home, xdg.as_deref()))
    }

    /// Build the candidate list for an explicit home directory and
    /// `XDG_CONFIG_HOME` value. An empty XDG value counts as unset.
    pub fn for_home(home: &Path, xdg_config_home: Option<&str>) -> Self {
        let xdg_rc = match xdg_config_home {
            Some(xdg) if !xdg.is_empty() => Path::new(xdg).join(RC_FILE_NAME),
            _ => home.join(".config").join(RC_FILE_NAME),
        };

        Self {
            paths: vec![
                home.join(RC_FILE_NAME),
                xdg_rc,
                Path::new(".").join(RC_FILE_NAME),
            ],
        }
    }

    /// Use an arbitrary ordered list of candidates.
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}
