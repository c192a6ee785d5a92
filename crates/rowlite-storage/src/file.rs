//! Record files - the seek/scan layer beneath the engine
//!
//! The engine never touches a file handle directly. It reads the
//! metadata block, scans the data region line by line, and rewrites the
//! whole content at flush, all through [`RecordFile`]. [`TextFile`] is
//! the on-disk implementation; [`MemoryFile`] keeps the same lines in a
//! buffer.
//!
//! Data lines travel as raw bytes. UTF-8 is only checked when a row is
//! decoded, so one damaged line never hides the rest of the file and is
//! written back untouched.

use crate::SyncMode;
use rowlite_core::format::METADATA_LINES;
use rowlite_core::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// Line-oriented storage holding a metadata block and a data region
pub trait RecordFile {
    /// Total number of lines, metadata included
    fn line_count(&mut self) -> Result<usize>;

    /// Reads up to [`METADATA_LINES`] lines from the start of the file
    fn read_metadata(&mut self) -> Result<Vec<String>>;

    /// Visits every non-empty data region line in file order.
    ///
    /// Stops early and returns the value when `visit` breaks.
    fn scan<B, V>(&mut self, visit: V) -> Result<Option<B>>
    where
        V: FnMut(&[u8]) -> ControlFlow<B>;

    /// Replaces the entire content with a metadata block and data lines
    fn rewrite(&mut self, metadata: &[String], data: &[Vec<u8>]) -> Result<()>;

    /// Visits every data region line
    fn for_each_line<V>(&mut self, mut visit: V) -> Result<()>
    where
        V: FnMut(&[u8]),
    {
        self.scan(|line| {
            visit(line);
            ControlFlow::<()>::Continue(())
        })?;
        Ok(())
    }

    /// Collects the data region
    fn data_lines(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        self.for_each_line(|line| lines.push(line.to_vec()))?;
        Ok(lines)
    }
}

fn strip_cr(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

/// A store file on disk, opened for simultaneous read and write
#[derive(Debug)]
pub struct TextFile {
    file: File,
    path: PathBuf,
    sync_mode: SyncMode,
}

impl TextFile {
    /// Opens an existing store file for read and write.
    pub fn open(path: impl AsRef<Path>, sync_mode: SyncMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Error::NotFound(format!("{} does not exist", path.display())));
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self {
            file,
            path,
            sync_mode,
        })
    }

    /// Creates a new, empty store file.
    ///
    /// An existing file is truncated only when `overwrite` is set.
    pub fn create(path: impl AsRef<Path>, sync_mode: SyncMode, overwrite: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() && !overwrite {
            return Err(Error::AlreadyExists(path));
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(&path)?;

        Ok(Self {
            file,
            path,
            sync_mode,
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw lines from the start of the file, terminators stripped
    fn raw_lines(&mut self) -> Result<impl Iterator<Item = io::Result<Vec<u8>>> + '_> {
        (&self.file).seek(SeekFrom::Start(0))?;
        Ok(BufReader::new(&self.file).split(b'\n').map(|line| line.map(strip_cr)))
    }
}

impl RecordFile for TextFile {
    fn line_count(&mut self) -> Result<usize> {
        let mut count = 0;
        for line in self.raw_lines()? {
            line?;
            count += 1;
        }
        Ok(count)
    }

    fn read_metadata(&mut self) -> Result<Vec<String>> {
        self.raw_lines()?
            .take(METADATA_LINES)
            .enumerate()
            .map(|(i, line)| {
                String::from_utf8(line?).map_err(|_| {
                    Error::ParseFailure(format!("metadata line {} is not valid UTF-8", i + 1))
                })
            })
            .collect()
    }

    fn scan<B, V>(&mut self, mut visit: V) -> Result<Option<B>>
    where
        V: FnMut(&[u8]) -> ControlFlow<B>,
    {
        for line in self.raw_lines()?.skip(METADATA_LINES) {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            if let ControlFlow::Break(found) = visit(&line) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn rewrite(&mut self, metadata: &[String], data: &[Vec<u8>]) -> Result<()> {
        (&self.file).seek(SeekFrom::Start(0))?;

        let mut written = 0u64;
        {
            let mut writer = BufWriter::new(&self.file);
            let lines = metadata
                .iter()
                .map(String::as_bytes)
                .chain(data.iter().map(Vec::as_slice));
            for line in lines {
                writer.write_all(line)?;
                writer.write_all(b"\n")?;
                written += line.len() as u64 + 1;
            }
            writer.flush()?;
        }

        // Drop whatever the previous, longer content left behind
        self.file.set_len(written)?;

        if self.sync_mode == SyncMode::Sync {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

/// Record file held in memory, for tests and throwaway stores
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    lines: Vec<String>,
}

impl MemoryFile {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer holding existing lines
    pub fn from_lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Current content, one entry per line
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl RecordFile for MemoryFile {
    fn line_count(&mut self) -> Result<usize> {
        Ok(self.lines.len())
    }

    fn read_metadata(&mut self) -> Result<Vec<String>> {
        Ok(self.lines.iter().take(METADATA_LINES).cloned().collect())
    }

    fn scan<B, V>(&mut self, mut visit: V) -> Result<Option<B>>
    where
        V: FnMut(&[u8]) -> ControlFlow<B>,
    {
        for line in self.lines.iter().skip(METADATA_LINES) {
            if line.is_empty() {
                continue;
            }
            if let ControlFlow::Break(found) = visit(line.as_bytes()) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn rewrite(&mut self, metadata: &[String], data: &[Vec<u8>]) -> Result<()> {
        // Data lines here only ever come from this buffer, so they are text
        self.lines = metadata
            .iter()
            .cloned()
            .chain(data.iter().map(|line| String::from_utf8_lossy(line).into_owned()))
            .collect();
        Ok(())
    }
}
