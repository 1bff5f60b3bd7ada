//! INI file configuration adapter.
//!
//! Values may carry a trailing `; comment` or `# comment`, which is stripped
//! before parsing. Numeric getters fall back to the default on malformed input;
//! `config_validation` is where malformed values are reported.

use crate::domain::error::TickreplayError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TickreplayError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TickreplayError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn value(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|raw| strip_inline_comment(&raw).to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

fn strip_inline_comment(raw: &str) -> &str {
    let cut = raw
        .match_indices([';', '#'])
        .find(|(i, _)| *i == 0 || raw[..*i].ends_with(char::is_whitespace))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..cut].trim()
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.value(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.value(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.value(section, key)
            .and_then(|v| Self::parse_bool(&v))
            .unwrap_or(default)
    }
}
