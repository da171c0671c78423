use super::*;

/// Truncate the discovered table set, then load `snapshot` into it.
///
/// An empty table set skips the truncate but still loads. Any failure is
/// returned as-is; tables already truncated stay truncated.
pub async fn restore<D>(db: &D, handle: &Handle, snapshot: &Snapshot) -> Result<Vec<String>>
where
    D: Database + ?Sized,
{
    let tables = db.tables(handle).await?;
    if tables.is_empty() {
        log::warn!("{:<32}{:<32}", "no restorable tables", "skipping truncate");
    } else {
        log::info!("{:<32}{:<32}", "truncating tables", tables.len());
        db.truncate(handle, &tables).await?;
    }
    log::info!("{:<32}{:<32}", "restoring snapshot", snapshot);
    db.restore(handle, snapshot).await?;
    match db.counts(handle, &tables).await {
        Ok(counts) => counts
            .iter()
            .for_each(|(table, n)| log::info!("{:<32}{:<32}", table, n)),
        Err(e) => log::warn!("{:<32}{}", "row counts unavailable", e),
    }
    Ok(tables)
}
