use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Deserializer, Serialize};
use strum::EnumString;
use serde_with::{serde_as, DisplayFromStr};

use crate::model::CategoryFilter;
use crate::search::SortKey;
use crate::storage::DEFAULT_STORAGE_KEY;

pub mod themes;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Notekeeper";
const APP_NAME: &str = "notekeeper";
const CONFIG_FILE: &str = "config.toml";

pub const CONFIG_ENV: &str = "NOTEKEEPER_CONFIG";
pub const DATA_ENV: &str = "NOTEKEEPER_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Reads the config file, writing the defaults first when none exists.
    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if self.paths.config_file.exists() {
            return self.load();
        }

        let mut config = AppConfig::default();
        config.post_load(&self.paths)?;
        self.persist(&config)?;
        tracing::info!(path = %self.paths.config_file.display(), "wrote default config");
        Ok(config)
    }

    pub fn load(&self) -> Result<AppConfig> {
        let path = &self.paths.config_file;
        let raw =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.post_load(&self.paths)?;
        Ok(config)
    }

    fn persist(&self, config: &AppConfig) -> Result<()> {
        let path = &self.paths.config_file;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let rendered = toml::to_string_pretty(config).context("serializing default config")?;
        fs::write(path, rendered).with_context(|| format!("writing config {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let (config_dir, config_file) = match env::var_os(CONFIG_ENV).map(PathBuf::from) {
            Some(path) if path.is_dir() => (path.clone(), path.join(CONFIG_FILE)),
            Some(path) => {
                let dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (dir, path)
            }
            None => {
                let dir = project_dirs.config_dir().to_path_buf();
                let file = dir.join(CONFIG_FILE);
                (dir, file)
            }
        };

        let data_dir = env::var_os(DATA_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = match project_dirs.state_dir() {
            Some(dir) => dir.to_path_buf(),
            None => data_dir.join("state"),
        };

        Ok(Self::rooted(config_dir, config_file, data_dir, state_dir))
    }

    /// Lays out every path below a single directory. Used by tests and
    /// portable installs.
    pub fn under(root: &Path) -> Self {
        let config_dir = root.join("config");
        let config_file = config_dir.join(CONFIG_FILE);
        Self::rooted(config_dir, config_file, root.join("data"), root.join("state"))
    }

    fn rooted(config_dir: PathBuf, config_file: PathBuf, data_dir: PathBuf, state_dir: PathBuf) -> Self {
        let database_path = data_dir.join("notes.db");
        let log_dir = state_dir.join("logs");
        Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
            log_dir,
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.log_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(deserialize_with = "lenient_theme")]
    pub theme: ThemeName,
    pub default_sort: SortKey,
    #[serde_as(as = "DisplayFromStr")]
    pub default_category: CategoryFilter,
    pub view_mode: ViewMode,
    /// Content lines shown per note card in grid view.
    pub preview_lines: u16,
    /// Entries in the sidebar "recent" list.
    pub recent_limit: usize,
    pub storage: StorageOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: ThemeName::Dark,
            default_sort: SortKey::Updated,
            default_category: CategoryFilter::All,
            view_mode: ViewMode::Grid,
            preview_lines: 3,
            recent_limit: 3,
            storage: StorageOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        self.storage
            .resolve(paths)
            .context("resolving storage paths")?;
        if self.storage.storage_key.trim().is_empty() {
            tracing::warn!("empty storage key in config, using default");
            self.storage.storage_key = DEFAULT_STORAGE_KEY.to_string();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    /// Key the note collection is stored under.
    pub storage_key: String,
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            wal_autocheckpoint: 1000,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.database_path.clone();
        }
        Ok(())
    }
}

/// Unknown theme names load as the dark theme instead of failing the file.
fn lenient_theme<'de, D>(deserializer: D) -> std::result::Result<ThemeName, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(theme = %raw, "unknown theme in config, falling back to dark");
        ThemeName::Dark
    }))
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    PartialEq,
    Eq,
    std::hash::Hash,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    HighContrast,
}

/// How the note list is laid out: multi-line cards or one row per note.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Grid => "grid",
            ViewMode::List => "list",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use tempfile::TempDir;

    #[test]
    fn first_run_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(ConfigPaths::under(temp.path()));
        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.storage.database_path, loader.paths().database_path);
        assert_eq!(cfg.storage.storage_key, "notes");

        let written = fs::read_to_string(&loader.paths().config_file)?;
        assert!(written.contains("default_sort = \"updated\""));
        assert!(written.contains("default_category = \"all\""));
        Ok(())
    }

    #[test]
    fn partial_config_fills_defaults() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::under(temp.path());
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "default_sort = \"title-desc\"\ndefault_category = \"ideas\"\nview_mode = \"list\"\n",
        )?;
        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.default_sort, SortKey::TitleDesc);
        assert_eq!(cfg.default_category, CategoryFilter::Only(Category::Ideas));
        assert_eq!(cfg.view_mode, ViewMode::List);
        assert_eq!(cfg.recent_limit, 3);
        Ok(())
    }

    #[test]
    fn unknown_theme_loads_as_dark() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::under(temp.path());
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "theme = \"neon\"\nview_mode = \"list\"\n")?;
        let cfg = ConfigLoader::from_paths(paths.clone()).load()?;
        assert_eq!(cfg.theme, ThemeName::Dark);
        assert_eq!(cfg.view_mode, ViewMode::List);

        fs::write(&paths.config_file, "theme = \"high-contrast\"\n")?;
        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.theme, ThemeName::HighContrast);
        Ok(())
    }

    #[test]
    fn blank_storage_key_falls_back() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::under(temp.path());
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "[storage]\nstorage_key = \"  \"\n")?;
        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.storage.storage_key, DEFAULT_STORAGE_KEY);
        Ok(())
    }
}
