use super::*;
use crate::error::Error;
use crate::shell;
use std::path::PathBuf;
use tokio::process::Command;

/// Runs stages as `<program> <args..> <stage> <target>` with inherited stdio.
pub struct Process {
    program: String,
    args: Vec<String>,
    dir: PathBuf,
}

impl Process {
    pub fn new(program: impl Into<String>, args: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            dir: dir.into(),
        }
    }

    fn command(&self, stage: Stage, target: Target) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(stage.name())
            .arg(target.to_string())
            .current_dir(&self.dir);
        cmd
    }
}

impl From<&crate::Config> for Process {
    fn from(config: &crate::Config) -> Self {
        Self::new(
            config.stage_program.clone(),
            config.stage_args.clone(),
            config.stage_dir.clone(),
        )
    }
}

#[async_trait::async_trait]
impl Runner for Process {
    async fn run(&self, stage: Stage, target: Target) -> crate::Result<()> {
        shell::status(&mut self.command(stage, target))
            .await
            .map_err(|reason| Error::StageFailed {
                stage,
                target,
                reason,
            })
    }
}
