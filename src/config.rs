// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the optional configuration file that tunes a
//! provisioning run. Every field has a default, so an empty or missing file
//! yields the stock behavior: back up dotfiles before overwriting them,
//! mirror into `/root`, and ask before running any optional step.
//!
//! # General Layout
//!
//! ```toml
//! [settings]
//! backup = true
//! root_home = "/root"
//!
//! [packages]
//! extra = ["htop", "jq"]
//!
//! [optional]
//! container_runtime = "ask"
//! version_manager = "yes"
//! root_mirror = "no"
//! ```

use crate::step::OptionalStep;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

/// Full configuration for a provisioning run.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub settings: Settings,

    /// Package selection on top of the fixed package list.
    pub packages: PackageSettings,

    /// Answer policy for optional steps.
    pub optional: OptionalAnswers,
}

impl Config {
    /// Load configuration file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file cannot be read, including
    ///   when it does not exist.
    /// - Return [`ConfigError::Deserialize`] if the file is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = read_to_string(path).map_err(|err| ConfigError::Read {
            source: err,
            path: path.to_path_buf(),
        })?;
        info!("load configuration from {:?}", path.display());

        data.parse()
    }

    /// Load configuration file at target path, or defaults if there is none.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the file is malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!("no configuration at {:?}, using defaults", path.display());
                Ok(Self::default())
            }
            result => result,
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on superuser home path.
        config.settings.root_home = PathBuf::from(
            shellexpand::full(config.settings.root_home.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// General settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Copy existing dotfiles aside before overwriting them.
    pub backup: bool,

    /// Home directory of the superuser, target of root mirroring.
    pub root_home: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup: true,
            root_home: PathBuf::from("/root"),
        }
    }
}

/// Package selection.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageSettings {
    /// Additional packages installed along with the fixed list. Names are
    /// passed to the package manager as is.
    pub extra: Vec<String>,
}

/// Answer policy of each optional step.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionalAnswers {
    pub container_runtime: Answer,
    pub version_manager: Answer,
    pub root_mirror: Answer,
}

impl OptionalAnswers {
    /// Answer policy configured for target optional step.
    pub fn get(&self, step: OptionalStep) -> Answer {
        match step {
            OptionalStep::ContainerRuntime => self.container_runtime,
            OptionalStep::VersionManager => self.version_manager,
            OptionalStep::RootMirror => self.root_mirror,
        }
    }

    /// Use the same answer for every optional step.
    pub fn all(answer: Answer) -> Self {
        Self {
            container_runtime: answer,
            version_manager: answer,
            root_mirror: answer,
        }
    }
}

/// How to answer the yes/no question of an optional step.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    /// Prompt the user interactively.
    #[default]
    Ask,

    /// Run the step without asking.
    Yes,

    /// Skip the step without asking.
    No,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
