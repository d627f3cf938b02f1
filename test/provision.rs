// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{FakeMachine, NVM_TAG};

use hearth::{
    config::{Answer, Config, OptionalAnswers},
    detect,
    dotfile::{DOTFILES, ZSHRC},
    plan::{nvm_installer_url, NVM_LOADER_MARKER, NVM_RELEASE_API, STARSHIP_INSTALLER},
    runner::RunError,
    workstation_steps, Context, Distro, Host, Outcome, Prompter, Report, Runner, UnsupportedPlatform,
    Workstation,
};

use anyhow::Result;
use inquire::InquireError;
use pretty_assertions::assert_eq;
use std::{
    fs::{read, read_dir, read_to_string, write},
    path::Path,
};
use tempfile::TempDir;

/// Prompter that must never be reached.
struct NoQuestions;

impl Prompter for NoQuestions {
    fn confirm(&self, question: &str) -> Result<bool, InquireError> {
        panic!("unexpected question: {question}")
    }
}

/// Prompter that says no to everything.
struct AlwaysNo;

impl Prompter for AlwaysNo {
    fn confirm(&self, _question: &str) -> Result<bool, InquireError> {
        Ok(false)
    }
}

struct Scratch {
    home: TempDir,
    root_home: TempDir,
}

impl Scratch {
    fn new() -> Result<Self> {
        Ok(Self {
            home: tempfile::tempdir()?,
            root_home: tempfile::tempdir()?,
        })
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.settings.root_home = self.root_home.path().to_path_buf();
        config
    }
}

fn provision(
    machine: &FakeMachine,
    config: &Config,
    home: &Path,
    prompter: impl Prompter,
    answer: Option<Answer>,
) -> Result<Report, RunError> {
    let distro = detect(machine).expect("fake machine has a package manager");
    let workstation = Workstation::new(home, "blah", distro);
    let ctx = Context {
        host: machine,
        config,
        workstation: &workstation,
    };

    Runner::new(ctx, prompter)
        .with_answer_override(answer)
        .run(&workstation_steps())
}

fn outcomes(report: &Report) -> Vec<(String, Outcome)> {
    report
        .iter()
        .map(|(name, outcome)| (name.to_string(), outcome))
        .collect()
}

fn backups_in(dir: &Path, name: &str) -> Result<Vec<String>> {
    let prefix = format!("{name}.hearth-");
    let mut backups = Vec::new();
    for entry in read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.starts_with(&prefix) {
            backups.push(name);
        }
    }

    Ok(backups)
}

#[test]
fn detect_fails_without_known_package_manager() {
    let machine = FakeMachine::with_programs(&["dnf"]);
    assert_eq!(detect(&machine), Err(UnsupportedPlatform));
}

#[test]
fn full_run_on_fresh_arch_machine() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let machine = FakeMachine::with_programs(&["pacman"]);

    let report = provision(
        &machine,
        &config,
        scratch.home.path(),
        NoQuestions,
        Some(Answer::Yes),
    )?;

    assert!(report.iter().all(|(_, outcome)| outcome == Outcome::Applied));
    assert!(machine.has_package("zsh"));
    assert!(machine.has_package("base-devel"));
    assert!(machine.has_program("starship"));
    assert!(machine.has_program("docker"));
    assert!(scratch.home.path().join(".nvm").join("nvm.sh").exists());
    for dotfile in DOTFILES {
        let mirrored = read_to_string(dotfile.path_in(scratch.root_home.path()))?;
        let original = read_to_string(dotfile.path_in(scratch.home.path()))?;
        assert_eq!(mirrored, original);
    }
    assert_eq!(
        machine.fetches(),
        vec![
            STARSHIP_INSTALLER.to_string(),
            NVM_RELEASE_API.to_string(),
            nvm_installer_url(NVM_TAG),
        ]
    );

    Ok(())
}

#[test]
fn second_run_changes_nothing() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let machine = FakeMachine::with_programs(&["pacman"]);
    let home = scratch.home.path();

    provision(&machine, &config, home, NoQuestions, Some(Answer::Yes))?;
    let calls_after_first = machine.calls();
    let fetches_after_first = machine.fetches();
    let zshrc_after_first = read_to_string(ZSHRC.path_in(home))?;

    let report = provision(&machine, &config, home, NoQuestions, Some(Answer::Yes))?;

    assert_eq!(
        outcomes(&report),
        vec![
            ("packages".to_string(), Outcome::AlreadySatisfied),
            ("prompt tool".to_string(), Outcome::AlreadySatisfied),
            ("dotfiles".to_string(), Outcome::AlreadySatisfied),
            ("container runtime".to_string(), Outcome::AlreadySatisfied),
            ("version manager".to_string(), Outcome::AlreadySatisfied),
            ("root mirror".to_string(), Outcome::AlreadySatisfied),
        ]
    );
    assert_eq!(machine.calls(), calls_after_first);
    assert_eq!(machine.fetches(), fetches_after_first);
    assert_eq!(read_to_string(ZSHRC.path_in(home))?, zshrc_after_first);
    assert!(backups_in(home, ".zshrc")?.is_empty());

    Ok(())
}

#[test]
fn declining_extras_still_provisions_base() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let machine = FakeMachine::with_programs(&["pacman"]);
    let home = scratch.home.path();

    let report = provision(&machine, &config, home, AlwaysNo, None)?;

    assert_eq!(
        outcomes(&report),
        vec![
            ("packages".to_string(), Outcome::Applied),
            ("prompt tool".to_string(), Outcome::Applied),
            ("dotfiles".to_string(), Outcome::Applied),
            ("container runtime".to_string(), Outcome::Declined),
            ("version manager".to_string(), Outcome::Declined),
            ("root mirror".to_string(), Outcome::Declined),
        ]
    );
    assert!(!machine.has_program("docker"));
    assert!(!home.join(".nvm").exists());
    assert!(!read_to_string(ZSHRC.path_in(home))?.contains(NVM_LOADER_MARKER));
    assert_eq!(read_dir(scratch.root_home.path())?.count(), 0);
    for dotfile in DOTFILES {
        assert!(dotfile.is_current_in(home)?);
    }

    Ok(())
}

#[test]
fn configured_answers_need_no_prompt() -> Result<()> {
    let scratch = Scratch::new()?;
    let mut config = scratch.config();
    config.optional = OptionalAnswers {
        container_runtime: Answer::No,
        version_manager: Answer::Yes,
        root_mirror: Answer::No,
    };
    let machine = FakeMachine::with_programs(&["apt-get"]);

    let report = provision(&machine, &config, scratch.home.path(), NoQuestions, None)?;

    assert_eq!(report.outcome("container runtime"), Some(Outcome::Declined));
    assert_eq!(report.outcome("version manager"), Some(Outcome::Applied));
    assert_eq!(report.outcome("root mirror"), Some(Outcome::Declined));

    Ok(())
}

#[test]
fn ubuntu_refreshes_index_and_uses_its_package_names() -> Result<()> {
    let scratch = Scratch::new()?;
    let mut config = scratch.config();
    config.packages.extra = vec!["jq".into()];
    let machine = FakeMachine::with_programs(&["apt-get"]);

    provision(&machine, &config, scratch.home.path(), AlwaysNo, Some(Answer::Yes))?;

    let calls = machine.calls();
    assert_eq!(calls[0], "sudo apt-get update");
    assert!(calls[1].starts_with("sudo apt-get install -y "));
    assert!(calls[1].ends_with(" jq"));
    assert!(machine.has_package("build-essential"));
    assert!(machine.has_package("docker.io"));
    assert!(machine.has_program("docker"));
    assert_eq!(detect(&machine), Ok(Distro::Ubuntu));

    Ok(())
}

#[test]
fn existing_dotfile_is_backed_up_once() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let machine = FakeMachine::with_programs(&["pacman"]);
    let home = scratch.home.path();
    write(home.join(".zshrc"), "# hand written\nalias ll='ls -l'\n")?;

    provision(&machine, &config, home, AlwaysNo, None)?;

    let backups = backups_in(home, ".zshrc")?;
    assert_eq!(backups.len(), 1);
    assert_eq!(
        read_to_string(home.join(&backups[0]))?,
        "# hand written\nalias ll='ls -l'\n"
    );
    assert_eq!(read_to_string(home.join(".zshrc"))?, ZSHRC.contents());
    assert!(backups_in(home, ".tmux.conf")?.is_empty());

    Ok(())
}

#[test]
fn backups_can_be_turned_off() -> Result<()> {
    let scratch = Scratch::new()?;
    let mut config = scratch.config();
    config.settings.backup = false;
    let machine = FakeMachine::with_programs(&["pacman"]);
    let home = scratch.home.path();
    write(home.join(".zshrc"), "# hand written\n")?;

    provision(&machine, &config, home, AlwaysNo, None)?;

    assert!(backups_in(home, ".zshrc")?.is_empty());
    assert_eq!(read_to_string(home.join(".zshrc"))?, ZSHRC.contents());

    Ok(())
}

#[test]
fn nvm_is_hooked_into_zshrc_exactly_once() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let machine = FakeMachine::with_programs(&["pacman"]);
    let home = scratch.home.path();

    provision(&machine, &config, home, NoQuestions, Some(Answer::Yes))?;
    provision(&machine, &config, home, NoQuestions, Some(Answer::Yes))?;

    let zshrc = read_to_string(ZSHRC.path_in(home))?;
    assert!(zshrc.starts_with(ZSHRC.contents()));
    assert_eq!(zshrc.matches(NVM_LOADER_MARKER).count(), 1);

    Ok(())
}

#[test]
fn fetch_failure_stops_the_run() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let machine = FakeMachine::with_programs(&["pacman"]).offline();
    let home = scratch.home.path();

    let result = provision(&machine, &config, home, NoQuestions, Some(Answer::Yes));

    assert!(matches!(result, Err(RunError::Step { ref name, .. }) if name == "prompt tool"));
    assert!(machine.has_package("git"));
    assert!(!ZSHRC.path_in(home).exists());

    Ok(())
}

#[test]
fn root_mirror_skips_missing_dotfiles() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let machine = FakeMachine::with_programs(&["pacman"]);
    let home = scratch.home.path();
    provision(&machine, &config, home, AlwaysNo, None)?;
    std::fs::remove_file(home.join(".tmux.conf"))?;

    let steps = workstation_steps();
    let mirror = steps
        .iter()
        .find(|step| step.name() == "root mirror")
        .expect("root mirror step exists");
    let workstation = Workstation::new(home, "blah", Distro::Arch);
    let ctx = Context {
        host: &machine,
        config: &config,
        workstation: &workstation,
    };
    mirror.apply(&ctx)?;

    assert!(mirror.is_satisfied(&ctx)?);
    assert!(ZSHRC.path_in(scratch.root_home.path()).exists());
    assert!(!scratch.root_home.path().join(".tmux.conf").exists());

    Ok(())
}

#[test]
fn removed_but_unpurged_package_is_reinstalled() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let installed = Distro::Ubuntu
        .base_packages()
        .into_iter()
        .filter(|package| *package != "fd-find")
        .collect::<Vec<_>>();
    let machine = FakeMachine::with_programs(&["apt-get"])
        .with_packages(&installed)
        .with_leftovers(&["fd-find"]);

    let report = provision(&machine, &config, scratch.home.path(), NoQuestions, Some(Answer::No))?;

    assert_eq!(report.outcome("packages"), Some(Outcome::Applied));
    assert!(machine.has_package("fd-find"));
    assert!(machine
        .calls()
        .iter()
        .any(|call| call.starts_with("sudo apt-get install -y ")));

    Ok(())
}

#[test]
fn non_utf8_zshrc_is_backed_up_and_replaced() -> Result<()> {
    let scratch = Scratch::new()?;
    let config = scratch.config();
    let machine = FakeMachine::with_programs(&["pacman"]);
    let home = scratch.home.path();
    write(home.join(".zshrc"), b"# caf\xe9 latin-1 comment\n")?;

    provision(&machine, &config, home, NoQuestions, Some(Answer::Yes))?;

    let backups = backups_in(home, ".zshrc")?;
    assert_eq!(backups.len(), 1);
    assert_eq!(read(home.join(&backups[0]))?, b"# caf\xe9 latin-1 comment\n");
    let zshrc = read_to_string(ZSHRC.path_in(home))?;
    assert!(zshrc.starts_with(ZSHRC.contents()));
    assert_eq!(zshrc.matches(NVM_LOADER_MARKER).count(), 1);

    Ok(())
}
