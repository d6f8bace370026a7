use crate::analysis::template::NamingTemplate;
use crate::error::Error;
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "Config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source_dirs: Vec<String>,
    pub target_root: String,
    pub trash_folder: String,
    #[serde(default = "default_filename_template")]
    pub filename_template: String,
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Allowed extensions, with leading dot. Empty allows every file.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_filename_template() -> String {
    NamingTemplate::FALLBACK.to_string()
}

fn default_chunk_size() -> usize {
    4096
}

fn default_db_path() -> String {
    "media_index.db".to_string()
}

fn default_batch_size() -> usize {
    1000
}

impl AppConfig {
    /// Config for the given roots with every optional key at its default.
    pub fn new(target_root: &str, trash_folder: &str) -> Self {
        Self {
            source_dirs: Vec::new(),
            target_root: normalize_path(target_root),
            trash_folder: normalize_path(trash_folder),
            filename_template: default_filename_template(),
            exclude_dirs: Vec::new(),
            ignore_patterns: Vec::new(),
            extensions: Vec::new(),
            chunk_size: default_chunk_size(),
            db_path: default_db_path(),
            batch_size: default_batch_size(),
        }
    }

    /// Normalize paths and extensions in place and check every value the
    /// pipeline relies on. Called once at startup.
    pub fn validate(mut self) -> Result<Self, Error> {
        self.target_root = normalize_path(&self.target_root);
        self.trash_folder = normalize_path(&self.trash_folder);
        self.source_dirs = self.source_dirs.iter().map(|p| normalize_path(p)).collect();
        self.extensions = self
            .extensions
            .iter()
            .map(|e| {
                let e = e.trim().to_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{}", e)
                }
            })
            .collect();

        if self.target_root.is_empty() {
            return Err(Error::Other("target_root must not be empty".to_string()));
        }
        if self.trash_folder.is_empty() {
            return Err(Error::Other("trash_folder must not be empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(Error::Other("chunk_size must be greater than zero".to_string()));
        }
        if self.batch_size == 0 {
            self.batch_size = default_batch_size();
        }

        self.naming_template()?;
        Ok(self)
    }

    pub fn naming_template(&self) -> Result<NamingTemplate, Error> {
        NamingTemplate::parse(&self.filename_template)
    }

    /// Location of the durable hash memo; it travels with the library.
    pub fn hash_cache_path(&self) -> String {
        format!("{}/{}", self.target_root.trim_end_matches('/'), crate::hasher::cache::CACHE_FILE_NAME)
    }
}

/// Load settings from a TOML file, with `MC_*` environment overrides.
/// A missing file or an invalid template is fatal.
pub fn load_configuration(path: &str) -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(path).required(true))
        .add_source(Environment::with_prefix("MC"))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()
}

/// Strip surrounding quotes and turn backslashes into forward slashes.
pub fn normalize_path(path: &str) -> String {
    path.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .replace('\\', "/")
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        if result.iter().any(|r| dir_path.starts_with(Path::new(r))) {
            continue;
        }
        result.retain(|r| !Path::new(r).starts_with(dir_path));
        result.push(dir);
    }

    result
}
