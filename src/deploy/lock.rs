use crate::error::Error;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Advisory lock guarding the database container and snapshot for one run.
/// Released when dropped.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> crate::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        // Explicit fs2 call to avoid conflict with std File::try_lock (1.89+).
        if let Err(e) = fs2::FileExt::try_lock_exclusive(&file) {
            return match e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                true => Err(Error::AlreadyRunning(path.to_path_buf())),
                false => Err(Error::Io(e)),
            };
        }
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        log::debug!("{:<32}{:<32}", "acquired run lock", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        log::debug!("{:<32}{:<32}", "released run lock", self.path.display());
    }
}
