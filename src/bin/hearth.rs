// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use hearth::{
    detect,
    path::{default_config_file, home_dir},
    workstation_steps, Answer, Config, Context, InquirePrompter, Runner, SystemHost, Workstation,
};

use anyhow::{Context as _, Result};
use clap::Parser;
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Provision a fresh Linux workstation.
///
/// Installs a fixed package set, the starship prompt, and dotfiles. Docker,
/// nvm, and mirroring dotfiles into the superuser's home are offered as
/// optional extras. Steps that are already done are skipped.
#[derive(Debug, Clone, Parser)]
#[command(version)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Answer yes to every optional step.
    #[arg(short, long, group = "answer")]
    pub yes: bool,

    /// Answer no to every optional step.
    #[arg(short, long, group = "answer")]
    pub no: bool,
}

impl Cli {
    fn answer_override(&self) -> Option<Answer> {
        if self.yes {
            Some(Answer::Yes)
        } else if self.no {
            Some(Answer::No)
        } else {
            None
        }
    }

    fn run(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(default_config_file()?)?,
        };

        let host = SystemHost::new();
        let distro = detect(&host)?;
        let user = std::env::var("USER").context("cannot determine invoking user from $USER")?;
        let workstation = Workstation::new(home_dir()?, user, distro);
        let ctx = Context {
            host: &host,
            config: &config,
            workstation: &workstation,
        };

        let report = Runner::new(ctx, InquirePrompter::new())
            .with_answer_override(self.answer_override())
            .run(&workstation_steps())?;

        info!("provisioning finished:\n{report}");

        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = Cli::parse().run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}
