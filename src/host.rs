// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Host system access.
//!
//! Everything hearth does to the machine outside of writing dotfiles goes
//! through the [`Host`] trait: looking up programs on `PATH`, calling
//! package managers and installer scripts, and fetching remote resources.
//! [`SystemHost`] is the real thing. Tests swap in their own implementation
//! to model a machine without touching one.

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    ffi::{OsStr, OsString},
    fmt::{Display, Formatter, Result as FmtResult},
    process::{Command, Stdio},
    time::Duration,
};
use tracing::{debug, instrument};

/// Layer of indirection for host access.
pub trait Host {
    /// Check if target program can be found on `PATH`.
    fn has_program(&self, program: &str) -> bool;

    /// Call program with inherited standard streams.
    ///
    /// Blocks until the program exits. Package managers and installers
    /// may ask the user for input, e.g., a sudo password.
    fn call_interactive(&self, call: &Syscall) -> Result<()>;

    /// Call program with all output discarded, reporting only whether it
    /// exited successfully.
    ///
    /// Used for queries, so a non-zero exit is an answer, not an error.
    fn call_quiet(&self, call: &Syscall) -> Result<bool>;

    /// Call program and capture its standard output.
    ///
    /// Returns `None` if the program exits unsuccessfully. Like
    /// [`Host::call_quiet`], this is meant for queries.
    fn call_captured(&self, call: &Syscall) -> Result<Option<String>>;

    /// Fetch text content of target URL.
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Description of a single program call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Syscall {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl Syscall {
    /// Construct new call of target program without arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Construct new call of target program through sudo.
    pub fn sudo(program: impl Into<OsString>) -> Self {
        Self::new("sudo").arg(program)
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a listing of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the call.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn get_program(&self) -> &OsStr {
        self.program.as_os_str()
    }

    pub fn get_args(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(OsString::as_os_str)
    }

    pub fn get_envs(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.envs
            .iter()
            .map(|(key, value)| (key.as_os_str(), value.as_os_str()))
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.envs(self.envs.iter().map(|(key, value)| (key, value)));
        command
    }
}

impl Display for Syscall {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for (key, value) in &self.envs {
            write!(fmt, "{}={} ", key.to_string_lossy(), value.to_string_lossy())?;
        }

        write!(fmt, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(fmt, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Host access to the machine hearth runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl SystemHost {
    /// Construct new system host.
    pub fn new() -> Self {
        Self
    }
}

impl Host for SystemHost {
    fn has_program(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    #[instrument(skip(self, call), fields(call = %call), level = "debug")]
    fn call_interactive(&self, call: &Syscall) -> Result<()> {
        let status = call
            .to_command()
            .status()
            .map_err(|err| HostError::Spawn {
                source: err,
                call: call.to_string(),
            })?;

        if !status.success() {
            return Err(HostError::Failed {
                call: call.to_string(),
                code: status.code(),
            });
        }

        Ok(())
    }

    #[instrument(skip(self, call), fields(call = %call), level = "debug")]
    fn call_quiet(&self, call: &Syscall) -> Result<bool> {
        let status = call
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| HostError::Spawn {
                source: err,
                call: call.to_string(),
            })?;
        debug!("exit status {status}");

        Ok(status.success())
    }

    #[instrument(skip(self, call), fields(call = %call), level = "debug")]
    fn call_captured(&self, call: &Syscall) -> Result<Option<String>> {
        let output = call
            .to_command()
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|err| HostError::Spawn {
                source: err,
                call: call.to_string(),
            })?;
        debug!("exit status {}", output.status);

        if !output.status.success() {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    #[instrument(skip(self), level = "debug")]
    fn fetch(&self, url: &str) -> Result<String> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        bar.set_message(format!("fetching {url}"));
        bar.enable_steady_tick(Duration::from_millis(100));

        let result = ureq::get(url)
            .call()
            .map_err(|err| HostError::Fetch {
                source: Box::new(err),
                url: url.to_string(),
            })
            .and_then(|response| {
                response.into_string().map_err(|err| HostError::ReadBody {
                    source: err,
                    url: url.to_string(),
                })
            });
        bar.finish_and_clear();

        result
    }
}

/// Host access error types.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Program could not be started at all.
    #[error("failed to run {call:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        call: String,
    },

    /// Program ran but exited unsuccessfully.
    #[error("command {call:?} failed with exit code {}", code.map_or("none".into(), |c| c.to_string()))]
    Failed { call: String, code: Option<i32> },

    /// Remote resource could not be fetched.
    #[error("failed to fetch {url}")]
    Fetch {
        #[source]
        source: Box<ureq::Error>,
        url: String,
    },

    /// Response body of remote resource could not be read.
    #[error("failed to read response body of {url}")]
    ReadBody {
        #[source]
        source: std::io::Error,
        url: String,
    },

    /// Style template cannot be set for progress spinner.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = HostError> = std::result::Result<T, E>;
