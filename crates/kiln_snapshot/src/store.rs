//! Compressed on-disk persistence of snapshots.
//!
//! The stream is gzip-compressed and holds a little-endian `u32` unit count,
//! then for each unit a length-prefixed digest string followed by a
//! length-prefixed unit path. Units are written in sorted order so equal
//! snapshots produce identical files.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use kiln_common::{Digest, UnitRef};

use crate::error::SnapshotError;
use crate::snapshot::Snapshot;

/// Name of the snapshot file within the state directory.
pub const SNAPSHOT_FILE: &str = "snapshot.gz";

/// Upper bound for a single length-prefixed field; anything larger is corruption.
const MAX_FIELD_LEN: usize = 64 * 1024;

/// Loads and saves the snapshot of the previous build generation.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store keeping its file in `state_dir`.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SNAPSHOT_FILE),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the previous snapshot.
    ///
    /// A missing file is not an error: it yields the empty snapshot, the state
    /// of a project that was never built.
    pub fn load(&self) -> Result<Snapshot, SnapshotError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::empty()),
            Err(e) => {
                return Err(SnapshotError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        read_snapshot(io::BufReader::new(file))
    }

    /// Persists `snapshot`, replacing the previous generation.
    ///
    /// The file is written next to its final location and renamed into place,
    /// so an interrupted save leaves the old snapshot intact.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SnapshotError::Io { path, source }
        };

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err(dir))?;
        }
        let tmp = self.path.with_extension("gz.tmp");
        let file = std::fs::File::create(&tmp).map_err(io_err(&tmp))?;
        write_snapshot(io::BufWriter::new(file), snapshot)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;
        tracing::debug!(units = snapshot.len(), path = %self.path.display(), "snapshot saved");
        Ok(())
    }

    /// Deletes the persisted snapshot, if any.
    pub fn clear(&self) -> Result<(), SnapshotError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapshotError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

/// Writes `snapshot` to `out` as a gzip stream.
pub fn write_snapshot<W: Write>(out: W, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let mut encoder = GzEncoder::new(out, Compression::default());
    let count = u32::try_from(snapshot.len()).map_err(|_| SnapshotError::Corrupt {
        reason: format!("too many units to persist: {}", snapshot.len()),
    })?;

    encoder.write_all(&count.to_le_bytes()).map_err(stream_err)?;
    for unit in snapshot.sorted_units() {
        let digest = snapshot.digest(&unit).cloned().unwrap_or_default();
        write_field(&mut encoder, digest.as_str())?;
        write_field(&mut encoder, unit.as_str())?;
    }

    encoder
        .finish()
        .and_then(|mut inner| inner.flush())
        .map_err(stream_err)
}

/// Reads a snapshot written by [`write_snapshot`].
pub fn read_snapshot<R: Read>(input: R) -> Result<Snapshot, SnapshotError> {
    let mut decoder = GzDecoder::new(input);
    let count = read_u32(&mut decoder)? as usize;

    let mut entries = Vec::with_capacity(count.min(MAX_FIELD_LEN));
    for _ in 0..count {
        let digest = read_field(&mut decoder)?;
        let unit = read_field(&mut decoder)?;
        if unit.is_empty() {
            return Err(SnapshotError::Corrupt {
                reason: "empty unit reference".to_string(),
            });
        }
        entries.push((UnitRef::new(unit), Digest::from_string(digest)));
    }
    Ok(entries.into_iter().collect())
}

fn write_field<W: Write>(out: &mut W, value: &str) -> Result<(), SnapshotError> {
    if value.len() > MAX_FIELD_LEN {
        return Err(SnapshotError::Corrupt {
            reason: format!("field of {} bytes exceeds the limit", value.len()),
        });
    }
    let len = value.len() as u32;
    out.write_all(&len.to_le_bytes()).map_err(stream_err)?;
    out.write_all(value.as_bytes()).map_err(stream_err)
}

fn read_u32<R: Read>(input: &mut R) -> Result<u32, SnapshotError> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf).map_err(corrupt)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_field<R: Read>(input: &mut R) -> Result<String, SnapshotError> {
    let len = read_u32(input)? as usize;
    if len > MAX_FIELD_LEN {
        return Err(SnapshotError::Corrupt {
            reason: format!("field length {len} exceeds the limit"),
        });
    }
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf).map_err(corrupt)?;
    String::from_utf8(buf).map_err(|e| SnapshotError::Corrupt {
        reason: e.to_string(),
    })
}

fn stream_err(source: io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: PathBuf::from("<snapshot stream>"),
        source,
    }
}

fn corrupt(e: io::Error) -> SnapshotError {
    SnapshotError::Corrupt {
        reason: e.to_string(),
    }
}
