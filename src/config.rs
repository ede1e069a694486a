use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Template identifiers for the five roles a listing page is built from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TemplateNames {
    pub parent: String,
    pub index: String,
    pub header: String,
    pub directory: String,
    pub file: String,
}

impl Default for TemplateNames {
    fn default() -> Self {
        Self {
            parent: "directory_index/parent.html".to_string(),
            index: "directory_index/index.html".to_string(),
            header: "directory_index/header.html".to_string(),
            directory: "directory_index/directory.html".to_string(),
            file: "directory_index/file.html".to_string(),
        }
    }
}

/// Per-mount overrides; unset roles fall back to the global names.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TemplateOverrides {
    pub parent: Option<String>,
    pub index: Option<String>,
    pub header: Option<String>,
    pub directory: Option<String>,
    pub file: Option<String>,
}

impl TemplateOverrides {
    fn apply(&self, base: &TemplateNames) -> TemplateNames {
        let pick = |over: &Option<String>, default: &String| {
            over.clone().unwrap_or_else(|| default.clone())
        };
        TemplateNames {
            parent: pick(&self.parent, &base.parent),
            index: pick(&self.index, &base.index),
            header: pick(&self.header, &base.header),
            directory: pick(&self.directory, &base.directory),
            file: pick(&self.file, &base.file),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MountSettings {
    pub source_dir: Option<PathBuf>,
    #[serde(default)]
    pub templates: Option<TemplateOverrides>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server_port: u16,
    pub log_level: String,
    pub font_awesome: bool,
    pub templates_dir: Option<PathBuf>,
    pub templates: TemplateNames,
    #[serde(default)]
    pub mounts: HashMap<String, MountSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let names = TemplateNames::default();
        let builder = Config::builder()
            // Default settings
            .set_default("server_port", 3000)?
            .set_default("log_level", "info")?
            .set_default("font_awesome", false)?
            .set_default("templates.parent", names.parent)?
            .set_default("templates.index", names.index)?
            .set_default("templates.header", names.header)?
            .set_default("templates.directory", names.directory)?
            .set_default("templates.file", names.file)?
            // Config file (optional)
            .add_source(File::with_name("config").required(false))
            // Environment variables (e.g. DIRINDEX_MOUNTS__ASSETS__SOURCE_DIR=/data/assets)
            .add_source(
                Environment::with_prefix("DIRINDEX")
                    .prefix_separator("_")
                    .separator("__"),
            );

        builder.build()?.try_deserialize()
    }
}

/// A mount as seen by the resolver: its id, where it lives on disk and
/// which templates render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    pub mount_id: String,
    pub source_dir: Option<PathBuf>,
    pub templates: TemplateNames,
}

impl MountConfig {
    pub fn has_source_dir(&self) -> bool {
        self.source_dir.is_some()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MountError {
    #[error("mount key {0:?} is empty once slashes are trimmed")]
    EmptyMount(String),
    #[error("mounts {0:?} and {1:?} both normalize to the same route")]
    Duplicate(String, String),
    #[error("mount {0:?} contains a route pattern character ('{{', '}}' or '*')")]
    PatternInMount(String),
    #[error("source directory {dir:?} of mount {mount:?} cannot be made absolute: {reason}")]
    SourceDir {
        mount: String,
        dir: PathBuf,
        reason: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: HashMap<String, MountConfig>,
}

impl MountTable {
    pub fn from_settings(settings: &Settings) -> Result<Self, MountError> {
        let mut mounts: HashMap<String, MountConfig> = HashMap::new();
        let mut raw_keys: HashMap<String, &str> = HashMap::new();

        for (key, mount) in &settings.mounts {
            let mount_id = key.trim_matches('/').to_string();
            if mount_id.is_empty() {
                return Err(MountError::EmptyMount(key.clone()));
            }
            if mount_id.contains(['{', '}', '*']) {
                return Err(MountError::PatternInMount(key.clone()));
            }
            if let Some(previous) = raw_keys.insert(mount_id.clone(), key) {
                return Err(MountError::Duplicate(previous.to_string(), key.clone()));
            }

            // Relative directories are anchored at the working directory.
            let source_dir = match &mount.source_dir {
                Some(dir) => Some(std::path::absolute(dir).map_err(|e| MountError::SourceDir {
                    mount: mount_id.clone(),
                    dir: dir.clone(),
                    reason: e.to_string(),
                })?),
                None => None,
            };

            let templates = match &mount.templates {
                Some(overrides) => overrides.apply(&settings.templates),
                None => settings.templates.clone(),
            };
            mounts.insert(
                mount_id.clone(),
                MountConfig {
                    mount_id,
                    source_dir,
                    templates,
                },
            );
        }

        Ok(Self { mounts })
    }

    pub fn get(&self, mount_id: &str) -> Option<&MountConfig> {
        self.mounts.get(mount_id)
    }

    /// Mounts ordered by id so routes register deterministically.
    pub fn iter(&self) -> impl Iterator<Item = &MountConfig> {
        let mut mounts: Vec<_> = self.mounts.values().collect();
        mounts.sort_by(|a, b| a.mount_id.cmp(&b.mount_id));
        mounts.into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}
