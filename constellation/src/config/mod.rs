use std::{
    fs::{create_dir_all, File},
    io::Read,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILENAME: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum CliConfigError {
    #[error("Io error: {}", .0)]
    IoError(std::io::Error),
    #[error("Serialization error: {}", .0)]
    SerializationError(serde_yaml::Error),
    #[error("Deserialization error: {}", .0)]
    DeserializationError(serde_yaml::Error),
    #[error("Configuration path is unspecified!")]
    ConfigPathUnspecified,
}

#[derive(Serialize, Deserialize, Default, Debug)]
#[serde(default)]
pub struct CliConfig {
    #[serde(skip)]
    pub path: Option<PathBuf>,
    /// currently selected constellation
    pub constellation: Option<String>,
}

impl CliConfig {
    pub fn load_or_create(path: &Path) -> Result<Self, CliConfigError> {
        debug!("Used config path: {path:?}");

        if let Some(parent) = path.parent() {
            create_dir_all(parent).map_err(CliConfigError::IoError)?;
        }

        let mut file = File::options()
            .create(true)
            .write(true)
            .read(true)
            .open(path)
            .map_err(CliConfigError::IoError)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(CliConfigError::IoError)?;

        let mut config: CliConfig = if contents.trim().is_empty() {
            CliConfig::default()
        } else {
            serde_yaml::from_str(&contents).map_err(CliConfigError::DeserializationError)?
        };

        config.path = Some(path.to_owned());

        Ok(config)
    }

    pub fn save(&self) -> Result<(), CliConfigError> {
        let path = self
            .path
            .as_ref()
            .ok_or(CliConfigError::ConfigPathUnspecified)?;
        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(CliConfigError::IoError)?;

        serde_yaml::to_writer(file, self).map_err(CliConfigError::SerializationError)?;

        Ok(())
    }
}
