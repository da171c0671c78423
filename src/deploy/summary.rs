use super::*;
use crate::database::Report;
use crate::error::Error;
use crate::stages::Stage;

/// What happened to the fresh snapshot in version control.
#[derive(Debug, Default)]
pub enum Versioning {
    #[default]
    Skipped,
    Unchanged,
    Merged,
    /// Either `VersioningFailed` (commit or push) or `MergeFailed`.
    Failed(Error),
}

/// Whether the service group was brought down at the end of the run.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum Teardown {
    #[default]
    Pending,
    Stopped,
    KeptUp,
    Failed(String),
}

/// Record of a run, built up as the orchestrator advances.
#[derive(Debug, Default)]
pub struct Summary {
    pub phases: Vec<Phase>,
    pub restored: Option<Vec<String>>,
    pub stages: Vec<Stage>,
    pub versioning: Versioning,
    pub report: Option<Report>,
    pub teardown: Teardown,
}

impl Summary {
    pub fn enter(&mut self, phase: Phase) {
        log::debug!("{:<32}{:<32}", "entering phase", phase);
        if let Phase::Stage(stage) = phase {
            self.stages.push(stage);
        }
        self.phases.push(phase);
    }
    pub fn reached(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }
    /// Lines for the end-of-run log.
    pub fn lines(&self) -> Vec<String> {
        let versioning = match self.versioning {
            Versioning::Skipped => String::from("skipped"),
            Versioning::Unchanged => String::from("unchanged"),
            Versioning::Merged => String::from("committed + merged"),
            Versioning::Failed(Error::MergeFailed { .. }) => String::from("MERGE FAILED"),
            Versioning::Failed(_) => String::from("FAILED"),
        };
        let teardown = match self.teardown {
            Teardown::Pending => String::from("pending"),
            Teardown::Stopped => String::from("stopped"),
            Teardown::KeptUp => String::from("kept up"),
            Teardown::Failed(_) => String::from("FAILED"),
        };
        let restored = match self.restored {
            Some(ref tables) => format!("{} tables", tables.len()),
            None => String::from("skipped"),
        };
        let rows = [
            ("Restore", restored),
            ("Stages", format!("{}/{}", self.stages.len(), Stage::all().len())),
            ("Snapshot", versioning),
            ("Runtime", teardown),
        ];
        let mut lines = vec![
            String::from("┌────────────┬────────────────────┐"),
            String::from("│ Step       │ Outcome            │"),
            String::from("├────────────┼────────────────────┤"),
        ];
        lines.extend(
            rows.iter()
                .map(|(step, outcome)| format!("│ {:<10} │ {:>18} │", step, outcome)),
        );
        lines.push(String::from("└────────────┴────────────────────┘"));
        lines
    }
}
