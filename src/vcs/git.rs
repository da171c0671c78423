use super::*;
use crate::error::Error;
use crate::shell;
use std::path::PathBuf;
use tokio::process::Command;

/// A git working tree with a push remote.
pub struct Git {
    dir: PathBuf,
    remote: String,
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            remote: remote.into(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.dir);
        cmd
    }

    /// Currently checked out branch.
    pub async fn branch(&self) -> std::result::Result<String, String> {
        shell::output(self.git().args(["rev-parse", "--abbrev-ref", "HEAD"]))
            .await
            .map(|out| out.trim().to_string())
    }

    async fn checkout(&self, branch: &str) -> std::result::Result<(), String> {
        if self.branch().await? == branch {
            return Ok(());
        }
        log::info!("{:<32}{:<32}", "checking out", branch);
        shell::output(self.git().args(["checkout", branch]))
            .await
            .map(|_| ())
    }

    async fn push(&self, branch: &str) -> std::result::Result<(), String> {
        log::info!("{:<32}{:<32}", "pushing", branch);
        shell::output(self.git().args(["push", self.remote.as_str(), branch]))
            .await
            .map(|_| ())
    }

    async fn fast_forward(&self, from: &str, into: &str) -> std::result::Result<(), String> {
        self.checkout(into).await?;
        shell::output(self.git().args(["merge", "--ff-only", from])).await?;
        self.push(into).await
    }
}

impl From<&crate::Config> for Git {
    fn from(config: &crate::Config) -> Self {
        Self::new(config.repository.clone(), config.remote.clone())
    }
}

#[async_trait::async_trait]
impl Vcs for Git {
    async fn changed(&self, path: &Path) -> Result<bool> {
        shell::output(self.git().args(["status", "--porcelain", "--"]).arg(path))
            .await
            .map(|out| !out.trim().is_empty())
            .map_err(Error::VersioningFailed)
    }

    async fn commit(&self, path: &Path, message: &str, branch: &str) -> Result<()> {
        self.checkout(branch).await.map_err(Error::VersioningFailed)?;
        shell::output(self.git().args(["add", "--"]).arg(path))
            .await
            .map_err(Error::VersioningFailed)?;
        log::info!("{:<32}{:<32}", "committing", path.display());
        shell::output(self.git().args(["commit", "-m", message, "--"]).arg(path))
            .await
            .map_err(Error::VersioningFailed)?;
        self.push(branch).await.map_err(Error::VersioningFailed)
    }

    async fn merge(&self, from: &str, into: &str) -> Result<()> {
        log::info!("{:<32}{:<32}", "merging forward", format!("{} -> {}", from, into));
        let merged = self.fast_forward(from, into).await;
        let restored = self.checkout(from).await;
        merged
            .and(restored)
            .map_err(|reason| Error::MergeFailed {
                from: from.to_string(),
                into: into.to_string(),
                reason,
            })
    }
}
