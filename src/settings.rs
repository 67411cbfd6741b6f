//! Persisted UI preferences.
//!
//! The theme is read once when [`ThemeSettings`] is loaded and written
//! through to the store on every change. The store is injected, so nothing
//! here is process-global.

use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

pub const THEME_KEY: &str = "streamify-theme";
pub const DEFAULT_THEME: &str = "light";
pub const DARK_THEME: &str = "dark";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key-value preferences.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("RwLock should not be poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values
            .write()
            .expect("RwLock should not be poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences kept as a flat JSON object in one file.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFilePreferences {
    /// Opens the store; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("RwLock should not be poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.write().expect("RwLock should not be poisoned");
        let previous = values.insert(key.to_string(), value.to_string());
        let written = serde_json::to_vec_pretty(&*values)
            .map_err(SettingsError::from)
            .and_then(|bytes| std::fs::write(&self.path, bytes).map_err(SettingsError::from));
        if written.is_err() {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
        }
        written
    }
}

/// The UI theme preference.
pub struct ThemeSettings {
    store: Arc<dyn PreferenceStore>,
    theme: String,
}

impl ThemeSettings {
    pub fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let theme = store
            .get(THEME_KEY)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_THEME.to_string());
        Self { store, theme }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn is_dark_mode(&self) -> bool {
        self.theme == DARK_THEME
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<(), SettingsError> {
        self.store.set(THEME_KEY, theme)?;
        self.theme = theme.to_string();
        Ok(())
    }

    /// Switches between dark and light, based on the persisted value.
    /// Any other theme counts as light.
    pub fn toggle_dark_mode(&mut self) -> Result<&str, SettingsError> {
        let persisted_dark = self.store.get(THEME_KEY).as_deref() == Some(DARK_THEME);
        let next = if persisted_dark { DEFAULT_THEME } else { DARK_THEME };
        self.set_theme(next)?;
        Ok(&self.theme)
    }
}
