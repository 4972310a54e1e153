//! Binary array archive.
//!
//! Layout: magic `b"ANKA"`, a format version byte, then named entries until
//! EOF. Each entry is a `u32` length-prefixed UTF-8 name, a dtype tag byte,
//! `rows` as `u64`, `width` as `u32`, and `rows * width` little-endian values.
//! There is no index, compression or padding.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ananke_core::{Column, ColumnData, Dtype};

use crate::error::{Result, StoreError};

pub const MAGIC: [u8; 4] = *b"ANKA";
pub const FORMAT_VERSION: u8 = 1;

/// Stream-level failure, before a path is attached.
#[derive(Debug)]
pub enum CodecError {
    Io(io::Error),
    Malformed(String),
}

impl CodecError {
    pub fn at(self, path: &Path) -> StoreError {
        match self {
            CodecError::Io(source) => StoreError::Io {
                path: path.to_path_buf(),
                source,
            },
            CodecError::Malformed(detail) => StoreError::Malformed {
                path: path.to_path_buf(),
                detail,
            },
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(e) => write!(f, "I/O error: {e}"),
            CodecError::Malformed(detail) => write!(f, "malformed archive: {detail}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(e) => Some(e),
            CodecError::Malformed(_) => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::Malformed("truncated archive".to_string())
        } else {
            CodecError::Io(e)
        }
    }
}

type CodecResult<T> = std::result::Result<T, CodecError>;

fn read_array<const N: usize>(r: &mut impl Read) -> CodecResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn encode_header(w: &mut impl Write) -> CodecResult<()> {
    w.write_all(&MAGIC)?;
    w.write_all(&[FORMAT_VERSION])?;
    Ok(())
}

pub fn decode_header(r: &mut impl Read) -> CodecResult<()> {
    let magic: [u8; 4] = read_array(r)?;
    if magic != MAGIC {
        return Err(CodecError::Malformed(format!(
            "bad magic {magic:?}, expected b\"ANKA\""
        )));
    }
    let [version] = read_array(r)?;
    if version != FORMAT_VERSION {
        return Err(CodecError::Malformed(format!(
            "unsupported format version {version}"
        )));
    }
    Ok(())
}

pub fn encode_column(w: &mut impl Write, name: &str, column: &Column) -> CodecResult<()> {
    w.write_all(&(name.len() as u32).to_le_bytes())?;
    w.write_all(name.as_bytes())?;
    w.write_all(&[column.dtype().tag()])?;
    w.write_all(&(column.rows() as u64).to_le_bytes())?;
    w.write_all(&(column.width() as u32).to_le_bytes())?;
    match column.data() {
        ColumnData::F32(v) => v.iter().try_for_each(|x| w.write_all(&x.to_le_bytes()))?,
        ColumnData::F64(v) => v.iter().try_for_each(|x| w.write_all(&x.to_le_bytes()))?,
        ColumnData::I32(v) => v.iter().try_for_each(|x| w.write_all(&x.to_le_bytes()))?,
        ColumnData::I64(v) => v.iter().try_for_each(|x| w.write_all(&x.to_le_bytes()))?,
    }
    Ok(())
}

/// Decode the next entry, or `None` at a clean EOF between entries.
pub fn decode_column(r: &mut impl Read) -> CodecResult<Option<(String, Column)>> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match r.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(CodecError::Malformed(format!(
                    "truncated entry header: got {filled} of 4 bytes"
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CodecError::Io(e)),
        }
    }

    let name_len = u32::from_le_bytes(len_buf) as u64;
    let mut name = Vec::new();
    (&mut *r).take(name_len).read_to_end(&mut name)?;
    if name.len() as u64 != name_len {
        return Err(CodecError::Malformed("truncated entry name".to_string()));
    }
    let name = String::from_utf8(name)
        .map_err(|e| CodecError::Malformed(format!("entry name is not UTF-8: {e}")))?;

    let [tag] = read_array(r)?;
    let dtype = Dtype::from_tag(tag)
        .ok_or_else(|| CodecError::Malformed(format!("unknown dtype tag {tag} for '{name}'")))?;
    let rows = u64::from_le_bytes(read_array(r)?);
    let width = u32::from_le_bytes(read_array(r)?) as u64;
    if width == 0 {
        return Err(CodecError::Malformed(format!("zero width for '{name}'")));
    }

    let n_bytes = rows
        .checked_mul(width)
        .and_then(|n| n.checked_mul(dtype.size() as u64))
        .ok_or_else(|| CodecError::Malformed(format!("payload size overflows for '{name}'")))?;
    let mut payload = Vec::new();
    (&mut *r).take(n_bytes).read_to_end(&mut payload)?;
    if payload.len() as u64 != n_bytes {
        return Err(CodecError::Malformed(format!(
            "truncated payload for '{name}': got {} of {n_bytes} bytes",
            payload.len()
        )));
    }

    let data = decode_payload(dtype, &payload);
    let column = Column::from_flat(data, width as usize)
        .ok_or_else(|| CodecError::Malformed(format!("bad shape for '{name}'")))?;
    Ok(Some((name, column)))
}

fn decode_payload(dtype: Dtype, bytes: &[u8]) -> ColumnData {
    // chunks_exact always yields slices of exactly the requested size
    match dtype {
        Dtype::F32 => ColumnData::F32(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        Dtype::I32 => ColumnData::I32(
            bytes
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        Dtype::F64 => ColumnData::F64(bytes.chunks_exact(8).map(|c| f64::from_le_bytes(eight(c))).collect()),
        Dtype::I64 => ColumnData::I64(bytes.chunks_exact(8).map(|c| i64::from_le_bytes(eight(c))).collect()),
    }
}

fn eight(c: &[u8]) -> [u8; 8] {
    [c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]
}

/// Decode a whole archive stream. Duplicate entry names are rejected.
pub fn decode_archive(r: &mut impl Read) -> CodecResult<BTreeMap<String, Column>> {
    decode_header(r)?;
    let mut entries = BTreeMap::new();
    while let Some((name, column)) = decode_column(r)? {
        if entries.contains_key(&name) {
            return Err(CodecError::Malformed(format!("duplicate entry '{name}'")));
        }
        entries.insert(name, column);
    }
    Ok(entries)
}

/// Read every entry of the archive at `path`.
pub fn read_archive(path: &Path) -> Result<BTreeMap<String, Column>> {
    let file = File::open(path).map_err(StoreError::io(path))?;
    let entries = decode_archive(&mut BufReader::new(file)).map_err(|e| e.at(path))?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "archive read");
    Ok(entries)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

/// Streams entries into `<path>.partial` and renames it into place on
/// [`finish`](ArchiveWriter::finish). Dropping an unfinished writer removes
/// the partial file.
pub struct ArchiveWriter {
    path: PathBuf,
    partial: PathBuf,
    writer: Option<BufWriter<File>>,
    entries: usize,
}

impl ArchiveWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let partial = partial_path(path);
        let file = File::create(&partial).map_err(StoreError::io(&partial))?;
        let mut this = Self {
            path: path.to_path_buf(),
            partial,
            writer: Some(BufWriter::new(file)),
            entries: 0,
        };
        let w = this.writer_mut()?;
        encode_header(w).map_err(|e| e.at(&this.partial))?;
        Ok(this)
    }

    fn writer_mut(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or_else(|| StoreError::Io {
            path: self.partial.clone(),
            source: io::Error::other("archive writer already finished"),
        })
    }

    pub fn write_column(&mut self, name: &str, column: &Column) -> Result<()> {
        let w = self.writer_mut()?;
        let res = encode_column(w, name, column);
        res.map_err(|e| e.at(&self.partial))?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Flush and move the archive into place.
    pub fn finish(mut self) -> Result<PathBuf> {
        let writer = self.writer.take();
        if let Some(writer) = writer {
            let file = writer
                .into_inner()
                .map_err(|e| StoreError::io(&self.partial)(e.into_error()))?;
            file.sync_all().map_err(StoreError::io(&self.partial))?;
        }
        fs::rename(&self.partial, &self.path).map_err(StoreError::io(&self.path))?;
        tracing::debug!(path = %self.path.display(), entries = self.entries, "archive finished");
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        self.writer.take();
        // after a successful finish the partial has already been renamed away
        if self.partial.exists() {
            let _ = fs::remove_file(&self.partial);
        }
    }
}

/// Write `columns` as one archive at `path`, atomically.
pub fn write_archive<'a>(
    path: &Path,
    columns: impl IntoIterator<Item = (&'a str, &'a Column)>,
) -> Result<PathBuf> {
    let mut writer = ArchiveWriter::create(path)?;
    for (name, column) in columns {
        writer.write_column(name, column)?;
    }
    writer.finish()
}
