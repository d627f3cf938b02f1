// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Provision a fresh Linux workstation.
//!
//! Hearth detects the distribution by its package manager, then runs a fixed
//! list of [steps](plan): install packages, install the prompt tool, write
//! dotfiles, and optionally install Docker, install nvm, and mirror the
//! dotfiles into the superuser's home.
//!
//! Every step knows how to tell whether its work is already done, so running
//! hearth twice on the same machine does nothing the second time around.

pub mod config;
pub mod distro;
pub mod dotfile;
pub mod host;
pub mod path;
pub mod plan;
pub mod runner;
pub mod step;

pub use config::{Answer, Config};
pub use distro::{detect, Distro, UnsupportedPlatform};
pub use host::{Host, SystemHost, Syscall};
pub use plan::workstation_steps;
pub use runner::{InquirePrompter, Outcome, Prompter, Report, Runner};
pub use step::{Context, Step, Workstation};
