use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// A snapshot file. A `.gz` suffix selects the gzip-compressed variant of
/// the same logical format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
    pub fn compressed(&self) -> bool {
        self.path
            .extension()
            .map_or(false, |ext| ext == crate::GZIP_SUFFIX)
    }

    /// Plain SQL stream, decompressed on the fly when compressed.
    pub fn reader(&self) -> std::io::Result<Box<dyn Read + Send>> {
        let file = BufReader::new(File::open(&self.path)?);
        match self.compressed() {
            true => Ok(Box::new(MultiGzDecoder::new(file))),
            false => Ok(Box::new(file)),
        }
    }

    /// Sibling path a dump is written to before it replaces the snapshot.
    pub fn partial(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(crate::PARTIAL_SUFFIX);
        PathBuf::from(name)
    }

    /// Open a writer for a new version of this snapshot. Nothing replaces
    /// the current file until [`Pending::commit`].
    pub fn writer(&self) -> std::io::Result<Pending> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let partial = self.partial();
        let file = BufWriter::new(File::create(&partial)?);
        let sink = match self.compressed() {
            true => Sink::Gzip(GzEncoder::new(file, Compression::default())),
            false => Sink::Raw(file),
        };
        Ok(Pending {
            sink,
            partial,
            target: self.path.clone(),
        })
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

enum Sink {
    Raw(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

/// An in-progress snapshot write.
pub struct Pending {
    sink: Sink,
    partial: PathBuf,
    target: PathBuf,
}

impl Pending {
    /// Finish the stream and atomically replace the snapshot.
    pub fn commit(self) -> std::io::Result<()> {
        let file = match self.sink {
            Sink::Raw(file) => file,
            Sink::Gzip(encoder) => encoder.finish()?,
        };
        file.into_inner()
            .map_err(|e| e.into_error())?
            .sync_all()?;
        std::fs::rename(&self.partial, &self.target)
    }
    /// Drop the partial file, leaving the previous snapshot untouched.
    pub fn discard(self) {
        let Self { sink, partial, .. } = self;
        drop(sink);
        let _ = std::fs::remove_file(partial);
    }
}

impl Write for Pending {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.sink {
            Sink::Raw(ref mut w) => w.write(buf),
            Sink::Gzip(ref mut w) => w.write(buf),
        }
    }
    fn flush(&mut self) -> std::io::Result<()> {
        match self.sink {
            Sink::Raw(ref mut w) => w.flush(),
            Sink::Gzip(ref mut w) => w.flush(),
        }
    }
}
