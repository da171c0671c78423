use super::*;
use crate::error::Error;
use crate::shell;
use std::path::PathBuf;
use tokio::process::Command;

/// Docker compose service group.
pub struct Compose {
    file: PathBuf,
}

impl Compose {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    fn compose(&self) -> Command {
        let mut cmd = Command::new("docker");
        cmd.arg("compose").arg("-f").arg(&self.file);
        cmd
    }
}

impl From<&crate::Config> for Compose {
    fn from(config: &crate::Config) -> Self {
        Self::new(config.compose.clone())
    }
}

#[async_trait::async_trait]
impl Runtime for Compose {
    async fn running(&self) -> bool {
        shell::output(self.compose().args(["ps", "--status", "running", "-q"]))
            .await
            .map(|out| Handle::first(&out).is_some())
            .unwrap_or(false)
    }

    async fn start(&self) -> crate::Result<()> {
        if self.running().await {
            log::info!("{:<32}{:<32}", "service group already up", self.file.display());
            return Ok(());
        }
        log::info!("{:<32}{:<32}", "starting service group", self.file.display());
        shell::output(self.compose().args(["up", "-d"]))
            .await
            .map(|_| ())
            .map_err(Error::RuntimeStartFailed)
    }

    async fn stop(&self) -> crate::Result<()> {
        log::info!("{:<32}{:<32}", "stopping service group", self.file.display());
        shell::output(self.compose().arg("down"))
            .await
            .map(|_| ())
            .map_err(|e| Error::Io(std::io::Error::other(e)))
    }

    async fn find(&self, filter: &Filter) -> crate::Result<Handle> {
        let listing = shell::output(
            Command::new("docker")
                .args(["ps", "-q", "--filter"])
                .arg(filter.arg()),
        )
        .await
        .unwrap_or_else(|e| {
            log::warn!("{:<32}{}", "docker ps failed", e);
            String::new()
        });
        Handle::first(&listing).ok_or_else(|| Error::RuntimeNotFound(filter.clone()))
    }
}
