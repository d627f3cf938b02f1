// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile templates and how to write them.
//!
//! Hearth ships a fixed set of dotfiles. Each one is written verbatim to its
//! target path under a home directory, replacing whatever was there. The
//! previous file can be kept as a sibling copy suffixed with
//! `.hearth-<YYYYmmdd-HHMMSS>`.
//!
//! A dotfile counts as current when the target already starts with the
//! template text. Later provisioning steps append to some of these files,
//! e.g., the version manager hooks itself into `.zshrc`, and that must not
//! make the dotfile look stale on the next run.

use chrono::Local;
use std::{
    fs::{copy, read, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Interactive shell configuration.
pub const ZSHRC: Dotfile = Dotfile::new(".zshrc", include_str!("../templates/zshrc"));

/// All dotfiles hearth writes, in write order.
pub const DOTFILES: &[Dotfile] = &[
    ZSHRC,
    Dotfile::new(".tmux.conf", include_str!("../templates/tmux.conf")),
    Dotfile::new(".config/nvim/init.vim", include_str!("../templates/init.vim")),
    Dotfile::new(".config/starship.toml", include_str!("../templates/starship.toml")),
];

/// A dotfile template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dotfile {
    target: &'static str,
    contents: &'static str,
}

impl Dotfile {
    /// Construct new dotfile template from target path relative to a home
    /// directory and its contents.
    pub const fn new(target: &'static str, contents: &'static str) -> Self {
        Self { target, contents }
    }

    /// Target path relative to a home directory.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Template text.
    pub fn contents(&self) -> &'static str {
        self.contents
    }

    /// Absolute target path under target home directory.
    pub fn path_in(&self, home: impl AsRef<Path>) -> PathBuf {
        home.as_ref().join(self.target)
    }

    /// Check if dotfile is current under target home directory.
    ///
    /// # Errors
    ///
    /// - Return [`DotfileError::Read`] if existing target cannot be read.
    pub fn is_current_in(&self, home: impl AsRef<Path>) -> Result<bool> {
        is_current(self.path_in(home), self.contents)
    }

    /// Write dotfile under target home directory.
    ///
    /// # Errors
    ///
    /// - Return [`DotfileError`] if backup or write fails.
    pub fn write_in(&self, home: impl AsRef<Path>, backup: bool) -> Result<Option<PathBuf>> {
        write_with_backup(self.path_in(home), self.contents, backup)
    }
}

/// Check if file at target path starts with target contents.
///
/// A missing file is simply not current. Existing content is compared as raw
/// bytes, so a file that is not valid UTF-8 is stale rather than unreadable.
///
/// # Errors
///
/// - Return [`DotfileError::Read`] if file exists but cannot be read.
pub fn is_current(path: impl AsRef<Path>, contents: &str) -> Result<bool> {
    let path = path.as_ref();
    match read(path) {
        Ok(existing) => Ok(existing.starts_with(contents.as_bytes())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(DotfileError::Read {
            source: err,
            path: path.to_path_buf(),
        }),
    }
}

/// Write contents to target path, overwriting existing content.
///
/// Parent directories are created as needed. If `backup` is set and a file
/// already exists at target path, it is first copied aside through
/// [`backup`]. The write itself is not atomic.
///
/// Returns path of backup copy if one was made.
///
/// # Errors
///
/// - Return [`DotfileError::CreateParent`] if parent directory cannot be made.
/// - Return [`DotfileError::Backup`] if backup copy fails.
/// - Return [`DotfileError::Write`] if file cannot be written.
#[instrument(skip(path, contents), fields(path = %path.as_ref().display()), level = "debug")]
pub fn write_with_backup(
    path: impl AsRef<Path>,
    contents: &str,
    backup: bool,
) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        mkdirp::mkdirp(parent).map_err(|err| DotfileError::CreateParent {
            source: err,
            path: parent.to_path_buf(),
        })?;
    }

    let backup_path = if backup && path.exists() {
        Some(self::backup(path)?)
    } else {
        None
    };

    info!("write {:?}", path.display());
    write(path, contents).map_err(|err| DotfileError::Write {
        source: err,
        path: path.to_path_buf(),
    })?;

    Ok(backup_path)
}

/// Copy file at target path to a timestamped sibling.
///
/// # Errors
///
/// - Return [`DotfileError::Backup`] if the copy fails.
pub fn backup(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let backup_path = free_backup_path(path, &stamp);

    info!("back up {:?} to {:?}", path.display(), backup_path.display());
    copy(path, &backup_path).map_err(|err| DotfileError::Backup {
        source: err,
        path: path.to_path_buf(),
        backup_path: backup_path.clone(),
    })?;

    Ok(backup_path)
}

/// Pick backup path for target file with target timestamp.
///
/// Two runs within the same second would collide, so a counter is appended
/// until the name is free.
fn free_backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".hearth-{stamp}"));
    let candidate = path.with_file_name(&name);
    if !candidate.exists() {
        return candidate;
    }

    let mut counter = 1;
    loop {
        let mut numbered = name.clone();
        numbered.push(format!("-{counter}"));
        let candidate = path.with_file_name(numbered);
        if !candidate.exists() {
            debug!("backup name taken, using {:?}", candidate.display());
            return candidate;
        }
        counter += 1;
    }
}

/// Dotfile writing error types.
#[derive(Debug, thiserror::Error)]
pub enum DotfileError {
    /// Existing dotfile cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Parent directory of dotfile cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateParent {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Existing dotfile cannot be copied aside.
    #[error("failed to back up {:?} to {:?}", path.display(), backup_path.display())]
    Backup {
        #[source]
        source: std::io::Error,
        path: PathBuf,
        backup_path: PathBuf,
    },

    /// Dotfile cannot be written.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = DotfileError> = std::result::Result<T, E>;
