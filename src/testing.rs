//! In-memory adapters that record every call into a shared journal.
use crate::database::*;
use crate::error::Error;
use crate::error::Result;
use crate::runtime::*;
use crate::stages::*;
use crate::vcs::*;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Shared, ordered record of adapter calls.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Write a snapshot of `table<TAB>row` lines, gzip-compressed by suffix.
pub fn fixture(dir: &Path, name: &str, rows: &[(&str, &str)]) -> Snapshot {
    let snapshot = Snapshot::new(dir.join(name));
    let mut pending = snapshot.writer().unwrap();
    for (table, row) in rows {
        writeln!(pending, "{}\t{}", table, row).unwrap();
    }
    pending.commit().unwrap();
    snapshot
}

/// Tables as vectors of opaque rows.
pub struct Memory {
    journal: Journal,
    tables: Mutex<BTreeMap<String, Vec<String>>>,
    handles: Mutex<Vec<Handle>>,
    fail: Vec<String>,
}

impl Memory {
    pub fn with(tables: &[&str]) -> Self {
        Self {
            journal: Journal::default(),
            tables: Mutex::new(
                tables
                    .iter()
                    .map(|t| (t.to_string(), Vec::new()))
                    .collect(),
            ),
            handles: Mutex::new(Vec::new()),
            fail: Vec::new(),
        }
    }
    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = journal.clone();
        self
    }
    /// Make the call recorded as `call` fail.
    pub fn failing(mut self, call: &str) -> Self {
        self.fail.push(call.to_string());
        self
    }
    pub fn seed(&self, table: &str, rows: &[&str]) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().map(|r| r.to_string()));
    }
    pub fn rows(&self, table: &str) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
    pub fn calls(&self) -> Vec<String> {
        self.journal.entries()
    }
    /// Container handle passed to each call, in order.
    pub fn handles(&self) -> Vec<Handle> {
        self.handles.lock().unwrap().clone()
    }
    fn target(&self, handle: &Handle) {
        self.handles.lock().unwrap().push(handle.clone());
    }
    fn record(&self, call: String) -> bool {
        let fails = self.fail.contains(&call);
        self.journal.push(call);
        fails
    }
}

#[async_trait::async_trait]
impl Database for Memory {
    async fn tables(&self, handle: &Handle) -> Result<Vec<String>> {
        self.target(handle);
        if self.record(String::from("tables")) {
            return Err(Error::Query(String::from("catalog unavailable")));
        }
        Ok(restorable(self.tables.lock().unwrap().keys().cloned()))
    }
    async fn truncate(&self, handle: &Handle, tables: &[String]) -> Result<()> {
        self.target(handle);
        for table in tables {
            if self.record(format!("truncate {}", table)) {
                return Err(Error::TruncateFailed {
                    table: table.clone(),
                    reason: String::from("lock timeout"),
                });
            }
            if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
                rows.clear();
            }
        }
        Ok(())
    }
    async fn restore(&self, handle: &Handle, snapshot: &Snapshot) -> Result<()> {
        self.target(handle);
        let failed = |reason: String| Error::RestoreFailed {
            path: snapshot.path().to_path_buf(),
            reason,
        };
        if self.record(format!("restore {}", file_name(snapshot.path()))) {
            return Err(failed(String::from("syntax error")));
        }
        let reader = std::io::BufReader::new(snapshot.reader().map_err(|e| failed(e.to_string()))?);
        let mut tables = self.tables.lock().unwrap();
        for line in reader.lines() {
            let line = line.map_err(|e| failed(e.to_string()))?;
            if let Some((table, row)) = line.split_once('\t') {
                tables.entry(table.to_string()).or_default().push(row.to_string());
            }
        }
        Ok(())
    }
    async fn dump(&self, handle: &Handle, snapshot: &Snapshot) -> Result<()> {
        self.target(handle);
        let failed = |reason: String| Error::DumpFailed {
            path: snapshot.path().to_path_buf(),
            reason,
        };
        if self.record(format!("dump {}", file_name(snapshot.path()))) {
            return Err(failed(String::from("disk full")));
        }
        let mut pending = snapshot.writer().map_err(|e| failed(e.to_string()))?;
        for (table, rows) in self.tables.lock().unwrap().iter() {
            if table == crate::MIGRATIONS {
                continue;
            }
            for row in rows {
                writeln!(pending, "{}\t{}", table, row).map_err(|e| failed(e.to_string()))?;
            }
        }
        pending.commit().map_err(|e| failed(e.to_string()))
    }
    async fn report(&self, handle: &Handle, _: &str) -> Result<Report> {
        self.target(handle);
        if self.record(String::from("report")) {
            return Err(Error::ReportFailed(String::from("relation does not exist")));
        }
        Ok(Report {
            columns: vec![String::from("table"), String::from("rows")],
            rows: self
                .tables
                .lock()
                .unwrap()
                .iter()
                .map(|(t, r)| vec![t.clone(), r.len().to_string()])
                .collect(),
        })
    }
    async fn counts(&self, handle: &Handle, tables: &[String]) -> Result<Vec<(String, i64)>> {
        self.target(handle);
        self.record(String::from("counts"));
        Ok(tables
            .iter()
            .map(|t| (t.clone(), self.rows(t).len() as i64))
            .collect())
    }
}

/// Service group that is either up or down, with one database container.
pub struct Group {
    journal: Journal,
    up: AtomicBool,
    container: Option<Handle>,
    fail_start: bool,
}

impl Group {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            up: AtomicBool::new(false),
            container: Some(Handle::from("db")),
            fail_start: false,
        }
    }
    pub fn without_container(mut self) -> Self {
        self.container = None;
        self
    }
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }
    pub fn running_already(self) -> Self {
        self.up.store(true, Ordering::SeqCst);
        self
    }
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Runtime for Group {
    async fn running(&self) -> bool {
        self.is_up()
    }
    async fn start(&self) -> Result<()> {
        if self.is_up() {
            self.journal.push("start (already up)");
            return Ok(());
        }
        self.journal.push("start");
        if self.fail_start {
            return Err(Error::RuntimeStartFailed(String::from("port in use")));
        }
        self.up.store(true, Ordering::SeqCst);
        Ok(())
    }
    async fn stop(&self) -> Result<()> {
        self.journal.push("stop");
        self.up.store(false, Ordering::SeqCst);
        Ok(())
    }
    async fn find(&self, filter: &Filter) -> Result<Handle> {
        self.journal.push("find");
        match (self.is_up(), self.container.clone()) {
            (true, Some(handle)) => Ok(handle),
            _ => Err(Error::RuntimeNotFound(filter.clone())),
        }
    }
}

/// Stage runner that succeeds unless told which stage breaks.
pub struct Script {
    journal: Journal,
    fail: Option<Stage>,
    hang: Option<Stage>,
}

impl Script {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            fail: None,
            hang: None,
        }
    }
    pub fn failing(mut self, stage: Stage) -> Self {
        self.fail = Some(stage);
        self
    }
    /// Make `stage` run forever.
    pub fn hanging(mut self, stage: Stage) -> Self {
        self.hang = Some(stage);
        self
    }
}

#[async_trait::async_trait]
impl Runner for Script {
    async fn run(&self, stage: Stage, target: Target) -> Result<()> {
        self.journal.push(format!("stage {} {}", stage, target));
        if self.hang == Some(stage) {
            futures::future::pending::<()>().await;
        }
        match self.fail == Some(stage) {
            true => Err(Error::StageFailed {
                stage,
                target,
                reason: String::from("exited with exit status: 1"),
            }),
            false => Ok(()),
        }
    }
}

/// Repository whose snapshot is either dirty or clean.
pub struct Repo {
    journal: Journal,
    dirty: bool,
    fail_commit: bool,
    fail_merge: bool,
}

impl Repo {
    pub fn new(journal: &Journal, dirty: bool) -> Self {
        Self {
            journal: journal.clone(),
            dirty,
            fail_commit: false,
            fail_merge: false,
        }
    }
    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }
    pub fn failing_merge(mut self) -> Self {
        self.fail_merge = true;
        self
    }
}

#[async_trait::async_trait]
impl Vcs for Repo {
    async fn changed(&self, path: &Path) -> Result<bool> {
        self.journal.push(format!("changed {}", file_name(path)));
        Ok(self.dirty)
    }
    async fn commit(&self, path: &Path, _: &str, branch: &str) -> Result<()> {
        self.journal.push(format!("commit {} {}", file_name(path), branch));
        match self.fail_commit {
            true => Err(Error::VersioningFailed(String::from("rejected push"))),
            false => Ok(()),
        }
    }
    async fn merge(&self, from: &str, into: &str) -> Result<()> {
        self.journal.push(format!("merge {} {}", from, into));
        match self.fail_merge {
            true => Err(Error::MergeFailed {
                from: from.to_string(),
                into: into.to_string(),
                reason: String::from("not possible to fast-forward"),
            }),
            false => Ok(()),
        }
    }
}
