// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Provisioning step representation.
//!
//! A __step__ is one discrete provisioning action: install some packages,
//! write some files. Each step may carry an __idempotency check__, a predicate
//! reporting whether the end state of the step already holds. The runner
//! skips any step whose check passes, which is what makes a second run of
//! hearth a no-op.
//!
//! Steps never look at ambient process state. Everything they need is handed
//! to them through a [`Context`].

use crate::{
    config::Config,
    distro::Distro,
    dotfile::DotfileError,
    host::{Host, HostError},
};

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// Everything a step may look at while checking or acting.
pub struct Context<'a> {
    pub host: &'a dyn Host,
    pub config: &'a Config,
    pub workstation: &'a Workstation,
}

/// Facts about the machine being provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workstation {
    /// Home directory of the invoking user.
    pub home: PathBuf,

    /// Login name of the invoking user.
    pub user: String,

    /// Detected distribution.
    pub distro: Distro,
}

impl Workstation {
    pub fn new(home: impl Into<PathBuf>, user: impl Into<String>, distro: Distro) -> Self {
        Self {
            home: home.into(),
            user: user.into(),
            distro,
        }
    }

    pub fn home(&self) -> &Path {
        self.home.as_path()
    }
}

/// Idempotency check of a step.
pub type Check = dyn Fn(&Context<'_>) -> Result<bool>;

/// Side effect of a step.
pub type Action = dyn Fn(&Context<'_>) -> Result<()>;

/// A named provisioning step.
pub struct Step {
    name: String,
    kind: StepKind,
    check: Option<Box<Check>>,
    action: Box<Action>,
}

impl Step {
    /// Construct new required step without an idempotency check.
    pub fn new(
        name: impl Into<String>,
        action: impl Fn(&Context<'_>) -> Result<()> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: StepKind::Required,
            check: None,
            action: Box::new(action),
        }
    }

    /// Attach idempotency check.
    pub fn with_check(mut self, check: impl Fn(&Context<'_>) -> Result<bool> + 'static) -> Self {
        self.check = Some(Box::new(check));
        self
    }

    /// Mark step as optional, gated behind a yes/no question.
    pub fn optional(mut self, which: OptionalStep) -> Self {
        self.kind = StepKind::Optional(which);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    /// Check if end state of step already holds.
    ///
    /// A step without a check is never satisfied.
    pub fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool> {
        match &self.check {
            Some(check) => check(ctx),
            None => Ok(false),
        }
    }

    /// Perform side effect of step.
    pub fn apply(&self, ctx: &Context<'_>) -> Result<()> {
        (self.action)(ctx)
    }
}

impl Debug for Step {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("Step")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("check", &self.check.is_some())
            .finish_non_exhaustive()
    }
}

/// Whether a step always runs, or only when the user agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Required,
    Optional(OptionalStep),
}

/// Steps the user can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalStep {
    ContainerRuntime,
    VersionManager,
    RootMirror,
}

impl OptionalStep {
    /// Question asked before running the step.
    pub fn question(&self) -> &'static str {
        match self {
            Self::ContainerRuntime => "Install Docker?",
            Self::VersionManager => "Install nvm (Node version manager)?",
            Self::RootMirror => "Copy dotfiles into the superuser's home too?",
        }
    }
}

/// Step error types.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Host interaction fails.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Dotfile handling fails.
    #[error(transparent)]
    Dotfile(#[from] DotfileError),

    /// Release metadata of a remote project is unusable.
    #[error("invalid release metadata from {url}")]
    ReleaseMetadata {
        #[source]
        source: serde_json::Error,
        url: String,
    },

    /// Local file needed by a step cannot be handled.
    #[error("failed to access {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StepError> = std::result::Result<T, E>;
