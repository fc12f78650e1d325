use std::{
    env,
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::{Context as _, Result};
use log::{error, info};

use crate::error::Error;

/// Looks `name` up in `PATH`, also trying the `.exe` suffix.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;

    env::split_paths(&paths).find_map(|dir| {
        [dir.join(name), dir.join(format!("{name}.exe"))]
            .into_iter()
            .find(|candidate| candidate.is_file())
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerShell {
    shell: String,
}

impl PowerShell {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// PowerShell 7 (`pwsh`) when installed, Windows PowerShell otherwise.
    pub fn detect() -> Self {
        if find_in_path("pwsh").is_some() {
            Self::new("pwsh")
        } else {
            Self::new("powershell")
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn run_file(&self, file: &Path) -> Result<()> {
        info!("run PowerShell script {}", file.display());

        let status = Command::new(&self.shell)
            .arg("-File")
            .arg(file)
            .status()
            .with_context(|| format!("failed to start {}", self.shell))?;

        if !status.success() {
            return Err(Error::ProcessFailed {
                program: format!("{} -File {}", self.shell, file.display()),
                status,
            }
            .into());
        }

        Ok(())
    }

    /// Runs `script` and returns its standard output.
    pub fn output(&self, script: &str) -> Result<String> {
        let output = Command::new(&self.shell)
            .args(["-NoProfile", "-NonInteractive", "-Command", script])
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to start {}", self.shell))?;

        if !output.status.success() {
            error!(
                "{} command failed: {}",
                self.shell,
                String::from_utf8_lossy(&output.stderr).trim()
            );

            return Err(Error::ProcessFailed {
                program: self.shell.clone(),
                status: output.status,
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Hands the rest of the container lifetime to a long-running daemon.
///
/// On Unix the current process image is replaced. Elsewhere the daemon runs as a
/// child with inherited stdio; Ctrl-C is left to the daemon and its exit status
/// becomes the result.
pub fn run_daemon<I, S>(program: &Path, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);

    info!("run {:?}", cmd);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt as _;

        let err = cmd.exec();

        Err(err).with_context(|| format!("failed to exec {}", program.display()))
    }

    #[cfg(not(unix))]
    {
        ctrlc::set_handler(|| {}).context("failed to set Ctrl-C handler")?;

        let status = cmd
            .status()
            .with_context(|| format!("failed to start {}", program.display()))?;

        if !status.success() {
            return Err(Error::ProcessFailed {
                program: program.display().to_string(),
                status,
            }
            .into());
        }

        Ok(())
    }
}
