use crate::backup::copy::chunked::DEFAULT_CHUNK_SIZE;
use crate::backup::copy::mmap::DEFAULT_LARGE_FILE_THRESHOLD;
use crate::backup::exclude::{default_rules, validate_rules, ExclusionRule};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::validate_dir_or_absent;

use bon::Builder;
use getset::{Getters, Setters};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use validator::Validate;

pub static DEFAULT_BACKUP_BASE_DIR: &str = "project_backups";

/// Settings for backup runs.
///
/// Every field has a default, so an empty YAML document is a valid
/// configuration:
///
/// ```yaml
/// backup_base_dir: /var/backups/project
/// exclude: [".git", "target", "*.log"]
/// large_file_threshold: 10485760
/// chunk_size: 1048576
/// remove_partial_files: false
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters, Setters, PartialEq)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub", set = "pub")]
pub struct BackupConfig {
    /// Directory holding one `backup_<timestamp>` directory per run
    #[validate(custom(function = validate_dir_or_absent))]
    #[serde(default = "default_backup_base_dir")]
    #[builder(default = default_backup_base_dir(), into)]
    backup_base_dir: PathBuf,
    /// Entry names never copied, checked in order
    #[validate(custom(function = validate_rules))]
    #[serde(default = "default_rules")]
    #[builder(default = default_rules(), into)]
    exclude: Vec<ExclusionRule>,
    /// Files at least this large are copied through memory maps
    #[validate(range(min = 1))]
    #[serde(default = "default_large_file_threshold")]
    #[builder(default = DEFAULT_LARGE_FILE_THRESHOLD)]
    large_file_threshold: u64,
    /// Buffer size for streaming smaller files
    #[validate(range(min = 1))]
    #[serde(default = "default_chunk_size")]
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Delete a destination file again when its copy fails half way
    #[serde(default)]
    #[builder(default)]
    remove_partial_files: bool,
}

fn default_backup_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BACKUP_BASE_DIR)
}

fn default_large_file_threshold() -> u64 {
    DEFAULT_LARGE_FILE_THRESHOLD
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BackupConfig {
    /// Reads and validates a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .with_msg(format!("Open config failed: {:?}", path))
            .and_then(|f| {
                serde_yml::from_reader::<_, BackupConfig>(f)
                    .map_err(Error::from)
                    .with_msg(format!("Parse YAML config failed: {:?}", path))
            })
            .and_then(|bc| {
                bc.validate()
                    .map_err(Error::from)
                    .map(|_| bc)
                    .with_msg(format!("Config validation failed: {:?}", path))
            })
    }
}
