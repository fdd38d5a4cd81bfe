// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use path_clean::clean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "cipherbatch.config.yaml";
pub const DEFAULT_DB_NAME: &str = "db";

// When a config file was found somewhere upstream of cwd the data lives next to it under
// .cipherbatch/data. Otherwise the OS data dir is used.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsEngine {
    name: String,
    /// Config file as resolved from `--config` or by searching upward. Always fully qualified.
    found_config_file: Option<PathBuf>,
    data_dir_override: Option<PathBuf>,
    /// Absolute path to a db or a path relative to `<data_dir>/<name>`
    db_file_override: Option<PathBuf>,
    default_data_dir: PathBuf,
    default_config_dir: PathBuf,
    cwd: PathBuf,
}

impl PathsEngine {
    pub fn new(
        name: &str,
        cwd: &Path,
        default_data_dir: &Path,
        default_config_dir: &Path,
        found_config_file: Option<&PathBuf>,
        data_dir_override: Option<&PathBuf>,
        db_file_override: Option<&PathBuf>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            cwd: cwd.to_path_buf(),
            default_data_dir: default_data_dir.to_path_buf(),
            default_config_dir: default_config_dir.to_path_buf(),
            found_config_file: found_config_file.cloned(),
            data_dir_override: data_dir_override.cloned(),
            db_file_override: db_file_override.cloned(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        if let Some(file) = self.found_config_file.clone() {
            return clean(file);
        }
        clean(self.default_config_dir.join(DEFAULT_CONFIG_NAME))
    }

    pub fn db_file(&self) -> PathBuf {
        match self.db_file_override.clone() {
            Some(db_file) if db_file.is_absolute() => clean(db_file),
            Some(db_file) => clean(self.get_data_dir().join(&self.name).join(db_file)),
            None => clean(self.get_data_dir().join(&self.name).join(DEFAULT_DB_NAME)),
        }
    }

    /// Relative paths resolve against the directory holding the config file
    pub fn relative_to_config(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }

        let config_file = self.config_file();
        let relative_from = config_file.parent().unwrap_or(&self.cwd);

        clean(relative_from.join(path))
    }

    fn get_data_dir(&self) -> PathBuf {
        if let Some(data_dir) = self.data_dir_override.clone() {
            return data_dir;
        }

        if let Some(parent) = self.found_config_file.as_ref().and_then(|f| f.parent()) {
            return parent.join(".cipherbatch").join("data");
        }

        self.default_data_dir.clone()
    }
}
