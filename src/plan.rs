// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! The fixed list of steps that provision a workstation.
//!
//! Order matters. Dotfiles have to exist before the version manager hooks
//! itself into `.zshrc`, and root mirroring copies whatever the dotfile step
//! produced.
//!
//! 1. __packages__: fixed package list plus configured extras.
//! 2. __prompt tool__: starship through its install script.
//! 3. __dotfiles__: write every stale template, see [`crate::dotfile`].
//! 4. __container runtime__ (optional): Docker from the distribution.
//! 5. __version manager__ (optional): latest nvm release.
//! 6. __root mirror__ (optional): copy dotfiles into the superuser's home.

use crate::{
    dotfile::{DOTFILES, ZSHRC},
    host::Syscall,
    step::{Context, OptionalStep, Result, Step, StepError},
};

use serde::Deserialize;
use std::{
    fs::{read, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Install script of the starship prompt.
pub const STARSHIP_INSTALLER: &str = "https://starship.rs/install.sh";

/// Latest release metadata of nvm.
pub const NVM_RELEASE_API: &str = "https://api.github.com/repos/nvm-sh/nvm/releases/latest";

/// First line of the block that loads nvm from `.zshrc`.
pub const NVM_LOADER_MARKER: &str = "# >>> hearth: nvm >>>";

const NVM_LOADER: &str = r#"
# >>> hearth: nvm >>>
export NVM_DIR="$HOME/.nvm"
[ -s "$NVM_DIR/nvm.sh" ] && . "$NVM_DIR/nvm.sh"
[ -s "$NVM_DIR/bash_completion" ] && . "$NVM_DIR/bash_completion"
# <<< hearth: nvm <<<
"#;

/// Install script of target nvm release.
pub fn nvm_installer_url(tag: &str) -> String {
    format!("https://raw.githubusercontent.com/nvm-sh/nvm/{tag}/install.sh")
}

/// All provisioning steps in execution order.
pub fn workstation_steps() -> Vec<Step> {
    vec![
        packages(),
        prompt_tool(),
        dotfiles(),
        container_runtime(),
        version_manager(),
        root_mirror(),
    ]
}

fn package_list(ctx: &Context<'_>) -> Vec<String> {
    let mut packages = ctx
        .workstation
        .distro
        .base_packages()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    packages.extend(ctx.config.packages.extra.iter().cloned());

    packages
}

fn packages() -> Step {
    Step::new("packages", |ctx| {
        let packages = package_list(ctx);
        info!("install {} packages", packages.len());
        for call in ctx.workstation.distro.install_calls(&packages) {
            ctx.host.call_interactive(&call)?;
        }

        Ok(())
    })
    .with_check(|ctx| {
        let packages = package_list(ctx);
        Ok(ctx.workstation.distro.has_packages(ctx.host, &packages)?)
    })
}

fn prompt_tool() -> Step {
    Step::new("prompt tool", |ctx| {
        run_installer(ctx, STARSHIP_INSTALLER, |script| {
            Syscall::new("sh").arg(script).arg("--yes")
        })
    })
    .with_check(|ctx| Ok(ctx.host.has_program("starship")))
}

fn dotfiles() -> Step {
    Step::new("dotfiles", |ctx| {
        let home = ctx.workstation.home();
        for dotfile in DOTFILES {
            if dotfile.is_current_in(home)? {
                debug!("{} is current", dotfile.target());
                continue;
            }

            if let Some(backup) = dotfile.write_in(home, ctx.config.settings.backup)? {
                info!("previous {} kept at {:?}", dotfile.target(), backup.display());
            }
        }

        Ok(())
    })
    .with_check(|ctx| {
        for dotfile in DOTFILES {
            if !dotfile.is_current_in(ctx.workstation.home())? {
                return Ok(false);
            }
        }

        Ok(true)
    })
}

fn container_runtime() -> Step {
    Step::new("container runtime", |ctx| {
        let distro = ctx.workstation.distro;
        let package = [distro.container_runtime_package().to_string()];
        for call in distro.install_calls(&package) {
            ctx.host.call_interactive(&call)?;
        }

        ctx.host.call_interactive(
            &Syscall::sudo("systemctl").args(["enable", "--now", "docker"]),
        )?;
        ctx.host.call_interactive(
            &Syscall::sudo("usermod")
                .args(["-aG", "docker"])
                .arg(&ctx.workstation.user),
        )?;
        info!("log out and back in for docker group membership to apply");

        Ok(())
    })
    .with_check(|ctx| Ok(ctx.host.has_program("docker")))
    .optional(OptionalStep::ContainerRuntime)
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

fn nvm_dir(ctx: &Context<'_>) -> PathBuf {
    ctx.workstation.home().join(".nvm")
}

fn has_nvm_loader(zshrc: &Path) -> Result<bool> {
    let marker = NVM_LOADER_MARKER.as_bytes();
    match read(zshrc) {
        Ok(contents) => Ok(contents.windows(marker.len()).any(|window| window == marker)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_error(err, zshrc)),
    }
}

fn version_manager() -> Step {
    Step::new("version manager", |ctx| {
        let nvm_dir = nvm_dir(ctx);
        if nvm_dir.join("nvm.sh").exists() {
            warn!("nvm already present at {:?}", nvm_dir.display());
        } else {
            let metadata = ctx.host.fetch(NVM_RELEASE_API)?;
            let release: Release =
                serde_json::from_str(&metadata).map_err(|err| StepError::ReleaseMetadata {
                    source: err,
                    url: NVM_RELEASE_API.into(),
                })?;
            info!("latest nvm release is {}", release.tag_name);

            // INVARIANT: The installer refuses an explicit NVM_DIR that does not exist.
            mkdirp::mkdirp(&nvm_dir).map_err(|err| io_error(err, &nvm_dir))?;
            run_installer(ctx, &nvm_installer_url(&release.tag_name), |script| {
                Syscall::new("bash")
                    .arg(script)
                    .env("NVM_DIR", &nvm_dir)
                    .env("PROFILE", "/dev/null")
            })?;
        }

        // INVARIANT: Hook nvm into the shell ourselves, exactly once.
        let zshrc = ZSHRC.path_in(ctx.workstation.home());
        if !has_nvm_loader(&zshrc)? {
            info!("hook nvm into {:?}", zshrc.display());
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&zshrc)
                .and_then(|mut file| file.write_all(NVM_LOADER.as_bytes()))
                .map_err(|err| io_error(err, &zshrc))?;
        }

        Ok(())
    })
    .with_check(|ctx| {
        let zshrc = ZSHRC.path_in(ctx.workstation.home());
        Ok(nvm_dir(ctx).join("nvm.sh").exists() && has_nvm_loader(&zshrc)?)
    })
    .optional(OptionalStep::VersionManager)
}

fn root_mirror() -> Step {
    Step::new("root mirror", |ctx| {
        let root_home = &ctx.config.settings.root_home;
        for dotfile in DOTFILES {
            let source = dotfile.path_in(ctx.workstation.home());
            if !source.exists() {
                warn!("{:?} does not exist, not mirroring it", source.display());
                continue;
            }

            let target = dotfile.path_in(root_home);
            if let Some(parent) = target.parent() {
                ctx.host
                    .call_interactive(&Syscall::sudo("mkdir").arg("-p").arg(parent))?;
            }
            ctx.host
                .call_interactive(&Syscall::sudo("cp").arg(&source).arg(&target))?;
        }

        Ok(())
    })
    .with_check(|ctx| {
        let root_home = &ctx.config.settings.root_home;
        for dotfile in DOTFILES {
            let source = dotfile.path_in(ctx.workstation.home());
            if !source.exists() {
                continue;
            }

            let compare = Syscall::sudo("cmp")
                .arg("-s")
                .arg(&source)
                .arg(dotfile.path_in(root_home));
            if !ctx.host.call_quiet(&compare)? {
                return Ok(false);
            }
        }

        Ok(true)
    })
    .optional(OptionalStep::RootMirror)
}

/// Fetch installer script from target URL, and run it through the call
/// built from the path of the downloaded script.
fn run_installer(
    ctx: &Context<'_>,
    url: &str,
    call: impl FnOnce(&Path) -> Syscall,
) -> Result<()> {
    let script = ctx.host.fetch(url)?;
    let mut file = NamedTempFile::new().map_err(|err| io_error(err, std::env::temp_dir()))?;
    file.write_all(script.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|err| io_error(err, file.path()))?;

    let call = call(file.path());
    info!("run installer from {url}");
    ctx.host.call_interactive(&call)?;

    Ok(())
}

fn io_error(source: std::io::Error, path: impl Into<PathBuf>) -> StepError {
    StepError::Io {
        source,
        path: path.into(),
    }
}
