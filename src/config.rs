// src/config.rs
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::Result;
use crate::locate::delimiter::ascii_byte;

pub const CONFIG_ENV_VAR: &str = "DLOGNORM_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "dlognorm.yaml";

/// Process-wide settings, read from YAML. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where `<name>.template.json` files live.
    pub templates_dir: PathBuf,
    /// Separator used when writing the normalized CSV.
    pub output_delimiter: char,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Lines shown before asking for boundary line numbers.
    pub preview_lines: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            output_delimiter: ',',
            log_filter: "info".into(),
            preview_lines: 20,
        }
    }
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_yaml::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// `explicit` path, else `$DLOGNORM_CONFIG`, else `./dlognorm.yaml` if present, else defaults.
    /// A path that was asked for explicitly must exist.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::load(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::load(local);
        }
        debug!("no config file, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        self.output_delimiter_byte().map(|_| ())
    }

    pub fn output_delimiter_byte(&self) -> Result<u8> {
        ascii_byte(self.output_delimiter)
    }
}
