//! Utilities and definitions for config handling

use crate::figment_utils::JsonProvider;
use crate::render::RenderConfig;
use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized},
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[cfg(target_os = "windows")]
use directories_next::ProjectDirs;

/// The expected filename for the config file
const CFG_FILE_NAME: &str = "config.json5";

/// The prefix for environment variables that override config values.
///
/// Nested keys are separated by a double underscore, e.g. `ROMDIFF_FORMATTING__DEFAULT=json`.
const ENV_PREFIX: &str = "ROMDIFF_";

/// The config struct for the application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Formatting options for display
    pub formatting: RenderConfig,
}

/// The possible errors that can arise when attempting to read a config
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("The file failed to deserialize")]
    DeserializationFailure(#[from] figment::Error),
    #[error("Failed to read the config file")]
    ReadFileFailure(#[from] io::Error),
    #[error("Unable to compute the default config file path")]
    NoDefault,
}

impl Config {
    /// Read a config from a given filepath, or fall back to the default file paths
    ///
    /// Values that are missing from the file take their default values, and environment
    /// variables prefixed with `ROMDIFF_` take precedence over the file. If there is no file at
    /// the path, the config is built from the defaults and the environment alone.
    pub fn try_from_file<P: AsRef<Path>>(path: Option<&P>) -> Result<Self, ReadError> {
        let config_fp = match path {
            Some(path) => path.as_ref().to_path_buf(),
            None => default_config_file_path().map_err(|_| ReadError::NoDefault)?,
        };
        info!("Reading config at {}", config_fp.to_string_lossy());
        let config_contents = match fs::read_to_string(&config_fp) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config file at {}", config_fp.to_string_lossy());
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(layered(config_contents.as_deref()).extract()?)
    }

    /// The default config with the `ROMDIFF_` environment overrides applied, for when no config
    /// file should be read.
    pub fn from_env() -> Result<Self, ReadError> {
        Ok(layered(None).extract()?)
    }
}

/// Stack the config sources: defaults, then the file contents if there are any, then the
/// environment.
fn layered(config_contents: Option<&str>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(contents) = config_contents {
        figment = figment.merge(JsonProvider::string(contents));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Return the default location for the config file (for *nix, Linux and MacOS), this will use
/// $XDG_CONFIG/.config, where `$XDG_CONFIG` is `$HOME/.config` by default.
#[cfg(not(target_os = "windows"))]
fn default_config_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("romdiff");
    let file_path = xdg_dirs.place_config_file(CFG_FILE_NAME)?;
    Ok(file_path)
}

/// Return the default location for the config file (for windows), this will use
/// $XDG_CONFIG_HOME/.config, where `$XDG_CONFIG_HOME` is `$HOME/.config` by default.
#[cfg(target_os = "windows")]
fn default_config_file_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "romdiff")
        .ok_or_else(|| anyhow::anyhow!("Was not able to retrieve config path"))?;
    let mut config_file: PathBuf = proj_dirs.config_dir().into();
    config_file.push(CFG_FILE_NAME);
    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Renderers;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_sample_config() {
        let mut sample_config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        sample_config_path.push("assets/sample_config.json5");
        Config::try_from_file(Some(sample_config_path).as_ref()).unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_| {
            let config = Config::try_from_file(Some(&PathBuf::from("nope.json5"))).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_env_applies_without_file() {
        Jail::expect_with(|jail| {
            jail.set_env("ROMDIFF_FORMATTING__DEFAULT", "json");
            let config = Config::try_from_file(Some(&PathBuf::from("nope.json5"))).unwrap();
            assert!(matches!(
                config.formatting.clone().get_renderer(None).unwrap(),
                Renderers::Json(_)
            ));
            assert_eq!(Config::from_env().unwrap(), config);
            Ok(())
        });
    }

    #[test]
    fn test_unreadable_file() {
        // A directory exists at the path but can't be read as a file
        let dir = tempfile::tempdir().unwrap();
        let err = Config::try_from_file(Some(&dir.path())).unwrap_err();
        assert!(matches!(err, ReadError::ReadFileFailure(_)));
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ formatting: {{ side_by_side: {{ 'tab-width': \"wide\" }} }} }}").unwrap();
        let err = Config::try_from_file(Some(&file.path())).unwrap_err();
        assert!(matches!(err, ReadError::DeserializationFailure(_)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        Jail::expect_with(|jail| {
            // JSON5 allows comments and unquoted keys
            jail.create_file(
                CFG_FILE_NAME,
                "{\n  // pick the machine readable output\n  formatting: { default: 'json' },\n}",
            )?;
            let config = Config::try_from_file(Some(&PathBuf::from(CFG_FILE_NAME))).unwrap();
            assert!(matches!(
                config.formatting.get_renderer(None).unwrap(),
                Renderers::Json(_)
            ));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CFG_FILE_NAME, "{ formatting: { default: 'json' } }")?;
            jail.set_env("ROMDIFF_FORMATTING__DEFAULT", "side_by_side");
            let config = Config::try_from_file(Some(&PathBuf::from(CFG_FILE_NAME))).unwrap();
            assert_eq!(
                config.formatting.get_renderer(None).unwrap(),
                Renderers::default()
            );
            Ok(())
        });
    }

    #[test]
    fn test_default_config_round_trips() {
        let serialized = serde_json::to_string(&Config::default()).unwrap();
        Jail::expect_with(|jail| {
            jail.create_file(CFG_FILE_NAME, &serialized)?;
            let config = Config::try_from_file(Some(&PathBuf::from(CFG_FILE_NAME))).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }
}
