//! Application configuration and theme preference.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{LocalStore, NotebookError, Result};

/// Local store key holding [`AppConfig`].
pub const CONFIG_KEY: &str = "notebook-config";
/// Local store key holding the [`Theme`] preference.
pub const THEME_KEY: &str = "theme-storage";

/// Code highlighting themes offered for light mode.
pub const LIGHT_CODE_THEMES: &[(&str, &str)] = &[
    ("github", "GitHub Light"),
    ("atom-one-light", "Atom One Light"),
    ("vs", "Visual Studio"),
];

/// Code highlighting themes offered for dark mode.
pub const DARK_CODE_THEMES: &[(&str, &str)] = &[
    ("atom-one-dark", "One Dark"),
    ("github-dark", "GitHub Dark"),
    ("monokai", "Monokai"),
    ("nord", "Nord"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeTheme {
    pub light: String,
    pub dark: String,
    pub no_background: bool,
}

impl Default for CodeTheme {
    fn default() -> Self {
        Self {
            light: "github".to_string(),
            dark: "atom-one-dark".to_string(),
            no_background: false,
        }
    }
}

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Autosave interval in milliseconds; `0` disables periodic autosave.
    pub auto_save_interval: u64,
    /// Directory that holds the notebook database.
    pub data_path: String,
    /// Last path picked in a file chooser.
    pub last_selected_path: String,
    pub code_theme: CodeTheme,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auto_save_interval: 800,
            data_path: "./data".to_string(),
            last_selected_path: String::new(),
            code_theme: CodeTheme::default(),
        }
    }
}

/// Partial update for [`AppConfig`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfigPatch {
    pub auto_save_interval: Option<u64>,
    pub data_path: Option<String>,
    pub last_selected_path: Option<String>,
    pub code_theme: Option<CodeTheme>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Holds the current [`AppConfig`] and mirrors every change to the local store.
pub struct ConfigStore {
    local: Arc<LocalStore>,
    config: AppConfig,
}

impl ConfigStore {
    /// Loads the saved config, falling back to defaults.
    pub fn load(local: Arc<LocalStore>) -> Self {
        let config = local.get(CONFIG_KEY).unwrap_or_default();
        Self { local, config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Merges `patch` into the config and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::InvalidConfig`] for an unknown code theme id,
    /// leaving the config unchanged.
    pub fn update(&mut self, patch: AppConfigPatch) -> Result<()> {
        let mut next = self.config.clone();
        if let Some(interval) = patch.auto_save_interval {
            next.auto_save_interval = interval;
        }
        if let Some(path) = patch.data_path {
            next.data_path = path;
        }
        if let Some(path) = patch.last_selected_path {
            next.last_selected_path = path;
        }
        if let Some(theme) = patch.code_theme {
            validate_code_theme(&theme)?;
            next.code_theme = theme;
        }
        self.config = next;
        self.persist()
    }

    pub fn set_auto_save_interval(&mut self, millis: u64) -> Result<()> {
        self.update(AppConfigPatch {
            auto_save_interval: Some(millis),
            ..AppConfigPatch::default()
        })
    }

    pub fn set_data_path(&mut self, path: impl Into<String>) -> Result<()> {
        self.update(AppConfigPatch {
            data_path: Some(path.into()),
            ..AppConfigPatch::default()
        })
    }

    pub fn set_last_selected_path(&mut self, path: impl Into<String>) -> Result<()> {
        self.update(AppConfigPatch {
            last_selected_path: Some(path.into()),
            ..AppConfigPatch::default()
        })
    }

    pub fn set_code_theme(&mut self, theme: CodeTheme) -> Result<()> {
        self.update(AppConfigPatch {
            code_theme: Some(theme),
            ..AppConfigPatch::default()
        })
    }

    /// Restores the defaults and persists them.
    pub fn reset(&mut self) -> Result<()> {
        self.config = AppConfig::default();
        self.persist()
    }

    pub fn theme(&self) -> Theme {
        self.local.get(THEME_KEY).unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.local.set(THEME_KEY, &theme)
    }

    /// Switches between light and dark and returns the new theme.
    pub fn toggle_theme(&self) -> Result<Theme> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    fn persist(&self) -> Result<()> {
        self.local.set(CONFIG_KEY, &self.config)
    }
}

fn validate_code_theme(theme: &CodeTheme) -> Result<()> {
    if !LIGHT_CODE_THEMES.iter().any(|(id, _)| *id == theme.light) {
        return Err(NotebookError::InvalidConfig(format!(
            "Unknown light code theme: {}",
            theme.light
        )));
    }
    if !DARK_CODE_THEMES.iter().any(|(id, _)| *id == theme.dark) {
        return Err(NotebookError::InvalidConfig(format!(
            "Unknown dark code theme: {}",
            theme.dark
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let store = ConfigStore::load(Arc::new(LocalStore::in_memory()));
        assert_eq!(store.config().auto_save_interval, 800);
        assert_eq!(store.config().data_path, "./data");
        assert_eq!(store.config().code_theme.dark, "atom-one-dark");
        assert_eq!(store.theme(), Theme::Light);
    }

    #[test]
    fn test_update_persists_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.json");
        {
            let mut store = ConfigStore::load(Arc::new(LocalStore::open(&path)));
            store.set_auto_save_interval(0).unwrap();
            store.set_data_path("/srv/notes").unwrap();
        }
        let store = ConfigStore::load(Arc::new(LocalStore::open(&path)));
        assert_eq!(store.config().auto_save_interval, 0);
        assert_eq!(store.config().data_path, "/srv/notes");
        assert_eq!(store.config().last_selected_path, "");
    }

    #[test]
    fn test_unknown_code_theme_is_rejected() {
        let mut store = ConfigStore::load(Arc::new(LocalStore::in_memory()));
        let err = store
            .set_code_theme(CodeTheme {
                light: "solarized".to_string(),
                ..CodeTheme::default()
            })
            .unwrap_err();
        assert!(matches!(err, NotebookError::InvalidConfig(_)));
        assert_eq!(store.config().code_theme, CodeTheme::default());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut store = ConfigStore::load(Arc::new(LocalStore::in_memory()));
        store.set_last_selected_path("/tmp/export.json").unwrap();
        store.reset().unwrap();
        assert_eq!(store.config(), &AppConfig::default());
    }

    #[test]
    fn test_partial_saved_config_fills_defaults() {
        let local = Arc::new(LocalStore::in_memory());
        local
            .set(CONFIG_KEY, &serde_json::json!({ "dataPath": "/var/notes" }))
            .unwrap();
        let store = ConfigStore::load(local);
        assert_eq!(store.config().data_path, "/var/notes");
        assert_eq!(store.config().auto_save_interval, 800);
    }

    #[test]
    fn test_toggle_theme() {
        let store = ConfigStore::load(Arc::new(LocalStore::in_memory()));
        assert_eq!(store.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(store.toggle_theme().unwrap(), Theme::Light);
    }
}
