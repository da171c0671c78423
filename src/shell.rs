//! Thin wrapper for the external tools the adapters drive.
use tokio::process::Command;

/// Render a command line for logs.
pub fn line(cmd: &Command) -> String {
    let cmd = cmd.as_std();
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run to completion, capturing output. `Ok(stdout)` on a zero exit status,
/// otherwise `Err` carrying trimmed stderr (or the status when stderr is empty).
pub async fn output(cmd: &mut Command) -> Result<String, String> {
    log::debug!("{:<32}{}", "exec", line(cmd));
    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("{} could not be spawned: {}", line(cmd), e))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match stderr.is_empty() {
            true => Err(format!("{} exited with {}", line(cmd), output.status)),
            false => Err(stderr),
        }
    }
}

/// Run to completion with inherited stdio. `Err` carries the exit status.
pub async fn status(cmd: &mut Command) -> Result<(), String> {
    log::debug!("{:<32}{}", "exec", line(cmd));
    let status = cmd
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| format!("{} could not be spawned: {}", line(cmd), e))?;
    match status.success() {
        true => Ok(()),
        false => Err(format!("exited with {}", status)),
    }
}
