use super::*;
use crate::error::Error;
use crate::shell;
use std::collections::HashMap;
use std::io::Read;
use std::process::Child;
use std::process::Stdio;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::Client;

/// Restorable tables in the public schema.
const TABLES: &str = const_format::concatcp!(
    "SELECT tablename::text FROM pg_catalog.pg_tables WHERE schemaname = '",
    crate::SCHEMA,
    "' AND tablename <> '",
    crate::MIGRATIONS,
    "' ORDER BY tablename"
);

/// Host address a container publishes one of its ports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// First binding in `docker port` output. Wildcard binds map to localhost.
    pub fn parse(listing: &str) -> Option<Self> {
        listing
            .lines()
            .map(str::trim)
            .filter_map(|line| line.rsplit_once(':'))
            .find_map(|(host, port)| {
                let port = port.parse::<u16>().ok()?;
                let host = match host.trim_start_matches('[').trim_end_matches(']') {
                    "" | "0.0.0.0" | "::" => String::from("localhost"),
                    host => host.to_string(),
                };
                Some(Self { host, port })
            })
    }
}

/// Postgres running inside the database container.
///
/// Catalog queries, truncation, counts and reports go over a `tokio-postgres`
/// connection to the port the container behind the handle publishes, one
/// connection per handle. Bulk load and dump stream through `psql` and
/// `pg_dump` executed in that container, which keeps the text dump format
/// intact.
pub struct Postgres {
    user: String,
    name: String,
    password: Option<String>,
    clients: Mutex<HashMap<Handle, Arc<Client>>>,
}

impl From<&crate::Config> for Postgres {
    fn from(config: &crate::Config) -> Self {
        Self {
            user: config.db_user.clone(),
            name: config.db_name.clone(),
            password: config.db_password.clone(),
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl Postgres {
    /// Connection to the database in `handle`, opened on first use and
    /// retried while a freshly started container boots.
    async fn client(&self, handle: &Handle) -> Result<Arc<Client>> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(handle) {
            return Ok(client.clone());
        }
        let endpoint = self.endpoint(handle).await?;
        log::debug!("{:<32}{:<32}", "database endpoint", format!("{}:{}", endpoint.host, endpoint.port));
        let client = Arc::new(connect(&self.url(&endpoint)).await.map_err(Error::Query)?);
        clients.insert(handle.clone(), client.clone());
        Ok(client)
    }

    /// Host binding of the container's Postgres port.
    async fn endpoint(&self, handle: &Handle) -> Result<Endpoint> {
        let listing = shell::output(&mut self.port(handle))
            .await
            .map_err(|e| Error::Query(format!("docker port {}: {}", handle, e)))?;
        Endpoint::parse(&listing).ok_or_else(|| {
            Error::Query(format!(
                "container {} publishes no host port for {}",
                handle,
                crate::POSTGRES_PORT
            ))
        })
    }

    fn port(&self, handle: &Handle) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("docker");
        cmd.arg("port").arg(handle.id()).arg(crate::POSTGRES_PORT);
        cmd
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!(
            "host={} port={} user={} dbname={}{}",
            endpoint.host,
            endpoint.port,
            self.user,
            self.name,
            self.password
                .as_ref()
                .map(|p| format!(" password={}", p))
                .unwrap_or_default(),
        )
    }

    /// `docker exec` of a Postgres client tool in the container.
    fn exec(&self, handle: &Handle, tool: &str) -> std::process::Command {
        let mut cmd = std::process::Command::new("docker");
        cmd.arg("exec").arg("-i");
        if let Some(ref password) = self.password {
            cmd.arg("-e").arg(format!("PGPASSWORD={}", password));
        }
        cmd.arg(handle.id())
            .arg(tool)
            .arg("-U")
            .arg(&self.user)
            .arg("-d")
            .arg(&self.name);
        cmd
    }

    fn psql(&self, handle: &Handle) -> std::process::Command {
        let mut cmd = self.exec(handle, "psql");
        cmd.args(["-q", "-v", "ON_ERROR_STOP=1"]);
        cmd
    }

    fn pg_dump(&self, handle: &Handle) -> std::process::Command {
        let mut cmd = self.exec(handle, "pg_dump");
        cmd.arg("--data-only")
            .arg(format!("--exclude-table={}.{}", crate::SCHEMA, crate::MIGRATIONS));
        cmd
    }
}

async fn connect(url: &str) -> std::result::Result<Client, String> {
    let mut last = String::new();
    for attempt in 1..=crate::CONNECT_ATTEMPTS {
        match tokio_postgres::connect(url, tokio_postgres::tls::NoTls).await {
            Ok((client, connection)) => {
                tokio::spawn(connection);
                client
                    .execute("SET client_min_messages TO WARNING", &[])
                    .await
                    .map_err(|e| e.to_string())?;
                log::debug!("{:<32}{:<32}", "connected to database", attempt);
                return Ok(client);
            }
            Err(e) => {
                log::debug!("{:<32}{}", "database not ready", e);
                last = e.to_string();
                tokio::time::sleep(crate::CONNECT_BACKOFF).await;
            }
        }
    }
    Err(last)
}

/// Collect the child's stderr on its own thread. The child blocks once the
/// pipe fills, so it must be read while stdin or stdout is being copied.
fn drain(child: &mut Child) -> std::thread::JoinHandle<String> {
    let stderr = child.stderr.take();
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_end(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).trim().to_string()
    })
}

/// Pipe `source` into the stdin of `cmd` and wait for it to exit.
fn load(mut cmd: std::process::Command, mut source: impl Read) -> std::result::Result<(), String> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| e.to_string())?;
    let errors = drain(&mut child);
    let copied = child
        .stdin
        .take()
        .ok_or_else(|| String::from("stdin unavailable"))
        .and_then(|mut stdin| std::io::copy(&mut source, &mut stdin).map_err(|e| e.to_string()));
    let status = child.wait().map_err(|e| e.to_string())?;
    let stderr = errors.join().unwrap_or_default();
    match (status.success(), copied) {
        (true, Ok(bytes)) => {
            log::debug!("{:<32}{:<32}", "bytes loaded", bytes);
            Ok(())
        }
        (true, Err(e)) => Err(e),
        (false, _) if !stderr.is_empty() => Err(stderr),
        (false, _) => Err(format!("exited with {}", status)),
    }
}

/// Copy the stdout of `cmd` into `sink`, committing it only on success.
fn unload(mut cmd: std::process::Command, mut sink: Pending) -> std::result::Result<(), String> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| e.to_string())?;
    let errors = drain(&mut child);
    let copied = child
        .stdout
        .take()
        .ok_or_else(|| String::from("stdout unavailable"))
        .and_then(|mut stdout| std::io::copy(&mut stdout, &mut sink).map_err(|e| e.to_string()));
    let status = child.wait().map_err(|e| e.to_string())?;
    let stderr = errors.join().unwrap_or_default();
    match (status.success(), copied) {
        (true, Ok(bytes)) => {
            log::debug!("{:<32}{:<32}", "bytes dumped", bytes);
            sink.commit().map_err(|e| e.to_string())
        }
        (true, Err(e)) => {
            sink.discard();
            Err(e)
        }
        (false, _) => {
            sink.discard();
            match stderr.is_empty() {
                true => Err(format!("exited with {}", status)),
                false => Err(stderr),
            }
        }
    }
}

#[async_trait::async_trait]
impl Database for Postgres {
    async fn tables(&self, handle: &Handle) -> Result<Vec<String>> {
        let rows = self
            .client(handle)
            .await?
            .query(TABLES, &[])
            .await
            .map_err(|e| Error::Query(e.to_string()))?;
        Ok(restorable(rows.iter().map(|r| r.get::<_, String>(0))))
    }

    async fn truncate(&self, handle: &Handle, tables: &[String]) -> Result<()> {
        let client = self.client(handle).await?;
        for table in tables {
            log::info!("{:<32}{:<32}", "truncating table", table);
            let sql = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", quote(table));
            client
                .batch_execute(&sql)
                .await
                .map_err(|e| Error::TruncateFailed {
                    table: table.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn restore(&self, handle: &Handle, snapshot: &Snapshot) -> Result<()> {
        let failed = |reason: String| Error::RestoreFailed {
            path: snapshot.path().to_path_buf(),
            reason,
        };
        let source = snapshot.reader().map_err(|e| failed(e.to_string()))?;
        let cmd = self.psql(handle);
        tokio::task::spawn_blocking(move || load(cmd, source))
            .await
            .map_err(|e| failed(e.to_string()))?
            .map_err(failed)
    }

    async fn dump(&self, handle: &Handle, snapshot: &Snapshot) -> Result<()> {
        let failed = |reason: String| Error::DumpFailed {
            path: snapshot.path().to_path_buf(),
            reason,
        };
        let sink = snapshot.writer().map_err(|e| failed(e.to_string()))?;
        let cmd = self.pg_dump(handle);
        tokio::task::spawn_blocking(move || unload(cmd, sink))
            .await
            .map_err(|e| failed(e.to_string()))?
            .map_err(failed)
    }

    async fn report(&self, handle: &Handle, query: &str) -> Result<Report> {
        self.client(handle)
            .await
            .map_err(|e| Error::ReportFailed(e.to_string()))?
            .simple_query(query)
            .await
            .map(Report::from)
            .map_err(|e| Error::ReportFailed(e.to_string()))
    }

    async fn counts(&self, handle: &Handle, tables: &[String]) -> Result<Vec<(String, i64)>> {
        let client = self.client(handle).await?;
        let mut counts = Vec::with_capacity(tables.len());
        for table in tables {
            let sql = format!("SELECT COUNT(*) FROM {}", quote(table));
            let n = client
                .query_one(&sql, &[])
                .await
                .map(|row| row.get::<_, i64>(0))
                .map_err(|e| Error::Query(e.to_string()))?;
            counts.push((table.clone(), n));
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres() -> Postgres {
        Postgres::from(&crate::Config::default())
    }

    fn line(cmd: &std::process::Command) -> String {
        std::iter::once(cmd.get_program())
            .chain(cmd.get_args())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn catalog_query_excludes_migrations() {
        assert!(TABLES.contains("schemaname = 'public'"));
        assert!(TABLES.contains("tablename <> 'alembic_version'"));
    }

    #[test]
    fn psql_stops_on_first_error() {
        let cmd = postgres().psql(&Handle::from("abc123"));
        assert_eq!(
            line(&cmd),
            "docker exec -i abc123 psql -U postgres -d events -q -v ON_ERROR_STOP=1"
        );
    }

    #[test]
    fn dump_is_data_only_without_migrations() {
        let cmd = postgres().pg_dump(&Handle::from("abc123"));
        assert_eq!(
            line(&cmd),
            "docker exec -i abc123 pg_dump -U postgres -d events --data-only --exclude-table=public.alembic_version"
        );
    }

    #[test]
    fn endpoint_follows_the_published_binding() {
        let listing = "0.0.0.0:55432\n[::]:55432\n";
        assert_eq!(
            Endpoint::parse(listing),
            Some(Endpoint {
                host: "localhost".into(),
                port: 55432
            })
        );
        assert_eq!(
            Endpoint::parse("127.0.0.1:6543"),
            Some(Endpoint {
                host: "127.0.0.1".into(),
                port: 6543
            })
        );
        assert_eq!(Endpoint::parse(""), None);
        assert_eq!(Endpoint::parse("no public port"), None);
    }

    #[test]
    fn connection_targets_the_handle() {
        let db = postgres();
        assert_eq!(
            crate::shell::line(&db.port(&Handle::from("abc123"))),
            "docker port abc123 5432/tcp"
        );
        let endpoint = Endpoint::parse("0.0.0.0:55432").unwrap();
        assert_eq!(
            db.url(&endpoint),
            "host=localhost port=55432 user=postgres dbname=events"
        );
    }

    #[test]
    fn password_travels_as_env() {
        let config = crate::Config::from_vars(|k| (k == "DB_PASSWORD").then(|| "s3cret".to_string()));
        let cmd = Postgres::from(&config).psql(&Handle::from("abc123"));
        assert!(line(&cmd).starts_with("docker exec -i -e PGPASSWORD=s3cret abc123 psql"));
    }

    #[test]
    fn load_streams_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("loaded.sql");
        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c").arg(format!("cat > {}", out.display()));
        load(cmd, "INSERT 1;\n".as_bytes()).unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "INSERT 1;\n");
    }

    #[test]
    fn load_failure_reports_stderr() {
        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c").arg("cat > /dev/null; echo 'ERROR: relation missing' >&2; exit 3");
        assert_eq!(
            load(cmd, "SELECT 1;".as_bytes()),
            Err("ERROR: relation missing".to_string())
        );
    }

    /// Run `f` on its own thread, failing if it does not finish in time.
    fn finishes<T, F>(f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || tx.send(f()));
        rx.recv_timeout(std::time::Duration::from_secs(30))
            .expect("child and parent blocked on each other")
    }

    #[test]
    fn load_survives_chatty_stderr() {
        let source = vec![b'x'; 200_000];
        let result = finishes(move || {
            let mut cmd = std::process::Command::new("sh");
            cmd.arg("-c").arg("head -c 200000 /dev/zero >&2; cat > /dev/null");
            load(cmd, source.as_slice())
        });
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn unload_survives_chatty_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(dir.path().join("latest.sql"));
        let sink = snapshot.writer().unwrap();
        let result = finishes(move || {
            let mut cmd = std::process::Command::new("sh");
            cmd.arg("-c").arg("head -c 200000 /dev/zero >&2; echo done");
            unload(cmd, sink)
        });
        assert_eq!(result, Ok(()));
        assert_eq!(std::fs::read_to_string(snapshot.path()).unwrap(), "done\n");
    }

    #[test]
    fn failed_unload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(dir.path().join("latest.sql"));
        std::fs::write(snapshot.path(), "old").unwrap();
        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c").arg("echo partial; exit 1");
        assert!(unload(cmd, snapshot.writer().unwrap()).is_err());
        assert_eq!(std::fs::read_to_string(snapshot.path()).unwrap(), "old");
        assert!(!snapshot.partial().exists());
    }

    #[test]
    fn unload_replaces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(dir.path().join("latest.sql.gz"));
        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c").arg("echo 'COPY public.event FROM stdin;'");
        unload(cmd, snapshot.writer().unwrap()).unwrap();
        let mut text = String::new();
        snapshot.reader().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "COPY public.event FROM stdin;\n");
    }
}
