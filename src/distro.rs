// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Distribution detection.
//!
//! Hearth does not read `/etc/os-release`. It only cares about which package
//! manager it can drive, so the distribution is whatever package manager
//! binary shows up first on `PATH`.

use crate::host::{self, Host, Syscall};

use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{debug, info};

/// Packages installed on every distribution, by their common name.
const COMMON_PACKAGES: &[&str] = &[
    "git", "curl", "wget", "zsh", "tmux", "neovim", "ripgrep", "fzf", "unzip", "htop",
];

/// Supported Linux distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    Arch,
    Ubuntu,
}

impl Distro {
    /// All supported distributions in detection priority order.
    pub const ALL: [Distro; 2] = [Distro::Arch, Distro::Ubuntu];

    /// Package manager binary whose presence identifies the distribution.
    pub fn package_manager(&self) -> &'static str {
        match self {
            Self::Arch => "pacman",
            Self::Ubuntu => "apt-get",
        }
    }

    /// Fixed package listing for the distribution.
    pub fn base_packages(&self) -> Vec<&'static str> {
        let mut packages = COMMON_PACKAGES.to_vec();
        match self {
            Self::Arch => packages.extend(["base-devel", "fd"]),
            Self::Ubuntu => packages.extend(["build-essential", "fd-find"]),
        }

        packages
    }

    /// Package providing the Docker engine.
    pub fn container_runtime_package(&self) -> &'static str {
        match self {
            Self::Arch => "docker",
            Self::Ubuntu => "docker.io",
        }
    }

    /// Calls that install target packages, in order.
    ///
    /// Ubuntu needs its package index refreshed first on a fresh machine.
    pub fn install_calls(&self, packages: &[String]) -> Vec<Syscall> {
        match self {
            Self::Arch => vec![Syscall::sudo("pacman")
                .args(["-S", "--needed", "--noconfirm"])
                .args(packages)],
            Self::Ubuntu => vec![
                Syscall::sudo("apt-get").arg("update"),
                Syscall::sudo("apt-get")
                    .args(["install", "-y"])
                    .args(packages),
            ],
        }
    }

    /// Check if all target packages are installed.
    ///
    /// Ubuntu keeps a database record for packages that were removed without
    /// purging, so its query looks at the recorded status instead of trusting
    /// the exit code alone.
    ///
    /// # Errors
    ///
    /// - Return [`host::HostError`] if the package manager cannot be queried.
    pub fn has_packages(&self, host: &dyn Host, packages: &[String]) -> host::Result<bool> {
        match self {
            Self::Arch => host.call_quiet(&Syscall::new("pacman").arg("-Q").args(packages)),
            Self::Ubuntu => {
                let query = Syscall::new("dpkg-query")
                    .args(["-W", "-f", "${db:Status-Abbrev}\\n"])
                    .args(packages);
                match host.call_captured(&query)? {
                    Some(statuses) => Ok(statuses.lines().all(is_fully_installed)),
                    None => Ok(false),
                }
            }
        }
    }
}

/// Check abbreviated dpkg status, e.g., `ii ` versus `rc ` for a package
/// whose configuration files outlived it.
fn is_fully_installed(status: &str) -> bool {
    status.starts_with("ii")
}

impl Display for Distro {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Arch => fmt.write_str("arch"),
            Self::Ubuntu => fmt.write_str("ubuntu"),
        }
    }
}

/// Detect distribution of host.
///
/// Probes for each known package manager in priority order, and returns the
/// first match.
///
/// # Errors
///
/// - Return [`UnsupportedPlatform`] if no known package manager is found.
pub fn detect(host: &dyn Host) -> Result<Distro, UnsupportedPlatform> {
    for distro in Distro::ALL {
        debug!("probe for {}", distro.package_manager());
        if host.has_program(distro.package_manager()) {
            info!("detected {distro} through {}", distro.package_manager());
            return Ok(distro);
        }
    }

    Err(UnsupportedPlatform)
}

/// Host has none of the supported package managers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported platform: neither pacman nor apt-get found on PATH")]
pub struct UnsupportedPlatform;
