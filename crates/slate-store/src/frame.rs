// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Length-prefixed record framing over append-only files.
//!
//! Frame layout:
//!
//! ``LENGTH(8, little-endian u64) || PAYLOAD``
//!
//! A frame whose prefix or payload is cut short, or whose declared length is
//! over the configured limit, reads as "no more records". Clean EOF and a
//! torn tail are deliberately indistinguishable to callers: neither leaves
//! anything further to trust.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::StoreError;

/// Bytes in a frame's length prefix.
pub const LEN_PREFIX: u64 = 8;

/// Write one frame and flush.
///
/// A failed or short write leaves the writer position undefined; the caller
/// must not retry a partial frame.
pub fn write_record<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    let mut frame = Vec::with_capacity(LEN_PREFIX as usize + bytes.len());
    frame.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    frame.extend_from_slice(bytes);
    writer.write_all(&frame)?;
    writer.flush()
}

/// Read one frame. `Ok(None)` means nothing further can be trusted.
pub fn read_record<R: Read>(reader: &mut R, max_len: u64) -> io::Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; LEN_PREFIX as usize];
    if !read_full(reader, &mut prefix)? {
        return Ok(None);
    }
    let len = u64::from_le_bytes(prefix);
    if len > max_len {
        return Ok(None);
    }
    let Ok(len) = usize::try_from(len) else {
        return Ok(None);
    };
    let mut payload = vec![0u8; len];
    if !read_full(reader, &mut payload)? {
        return Ok(None);
    }
    Ok(Some(payload))
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}

/// Sequential frame reader that knows each frame's starting offset.
pub struct FrameReader<R> {
    inner: R,
    offset: u64,
    max_len: u64,
}

impl<R: Read> FrameReader<R> {
    /// Wrap `inner`, which must already be positioned at `offset`.
    pub fn new(inner: R, offset: u64, max_len: u64) -> Self {
        Self {
            inner,
            offset,
            max_len,
        }
    }

    /// Offset of the next frame.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next `(offset, payload)` pair, or `None` at the end of trusted data.
    pub fn next_frame(&mut self) -> io::Result<Option<(u64, Vec<u8>)>> {
        let start = self.offset;
        let Some(payload) = read_record(&mut self.inner, self.max_len)? else {
            return Ok(None);
        };
        self.offset = start + LEN_PREFIX + payload.len() as u64;
        Ok(Some((start, payload)))
    }
}

/// One append-only log file.
///
/// Opened for read + append, so writes always land at the physical end
/// regardless of where readers have seeked.
pub struct LogFile {
    path: PathBuf,
    file: File,
    len: u64,
    max_record_len: u64,
    sync_writes: bool,
}

impl LogFile {
    /// Open or create the log at `path`.
    pub fn open(path: impl Into<PathBuf>, max_record_len: u64, sync_writes: bool) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            len,
            max_record_len,
            sync_writes,
        })
    }

    /// Path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current end-of-file offset.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append one frame; returns the frame's starting offset.
    ///
    /// A failed append truncates the file back to its previous length.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64, StoreError> {
        if bytes.len() as u64 > self.max_record_len {
            return Err(StoreError::RecordTooLarge {
                len: bytes.len(),
                limit: self.max_record_len,
            });
        }
        let start = self.len;
        let written = write_record(&mut self.file, bytes).and_then(|()| {
            if self.sync_writes {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(err) = written {
            if let Err(trunc) = self.file.set_len(start) {
                warn!(path = %self.path.display(), ?trunc, "failed to roll back partial frame");
            }
            return Err(err.into());
        }
        self.len = start + LEN_PREFIX + bytes.len() as u64;
        Ok(start)
    }

    /// Drop everything after `len`. Used to undo this session's own
    /// appends when a later step of the same operation fails.
    pub fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        if len < self.len {
            self.file.set_len(len)?;
            self.len = len;
        }
        Ok(())
    }

    /// Deal with bytes past `trusted` that recovery could not read: cut them
    /// when `trim` is set, otherwise leave them and warn. Returns the number
    /// of bytes dropped.
    pub fn discard_tail(&mut self, trusted: u64, trim: bool) -> io::Result<u64> {
        let untrusted = self.len.saturating_sub(trusted);
        if untrusted == 0 {
            return Ok(0);
        }
        if !trim {
            warn!(path = %self.path.display(), trusted, untrusted, "log has an untrusted tail");
            return Ok(0);
        }
        warn!(path = %self.path.display(), trusted, dropped = untrusted, "discarding untrusted log tail");
        self.truncate_to(trusted)?;
        Ok(untrusted)
    }

    /// Frames starting at `offset`.
    pub fn frames_from(&self, offset: u64) -> io::Result<FrameReader<BufReader<&File>>> {
        let mut reader = BufReader::new(&self.file);
        reader.seek(SeekFrom::Start(offset))?;
        Ok(FrameReader::new(reader, offset, self.max_record_len))
    }

    /// Copy the raw log bytes into `out`.
    pub fn copy_to<W: Write>(&self, out: &mut W) -> io::Result<u64> {
        let mut reader = &self.file;
        reader.seek(SeekFrom::Start(0))?;
        io::copy(&mut reader.take(self.len), out)
    }

    /// Flush file contents to stable storage.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_round_trip_with_offsets() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"first").unwrap();
        write_record(&mut buf, b"").unwrap();
        write_record(&mut buf, b"third").unwrap();

        let mut reader = FrameReader::new(Cursor::new(buf), 0, 1024);
        assert_eq!(reader.next_frame().unwrap(), Some((0, b"first".to_vec())));
        assert_eq!(reader.next_frame().unwrap(), Some((13, Vec::new())));
        assert_eq!(reader.next_frame().unwrap(), Some((21, b"third".to_vec())));
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn truncated_tail_reads_as_end() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"whole").unwrap();
        write_record(&mut buf, b"cut short").unwrap();
        buf.truncate(buf.len() - 3);

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_record(&mut cursor, 1024).unwrap(), Some(b"whole".to_vec()));
        assert_eq!(read_record(&mut cursor, 1024).unwrap(), None);
    }

    #[test]
    fn partial_prefix_reads_as_end() {
        let mut cursor = Cursor::new(vec![5u8, 0, 0]);
        assert_eq!(read_record(&mut cursor, 1024).unwrap(), None);
    }

    #[test]
    fn oversized_length_reads_as_end() {
        let mut buf = Vec::new();
        write_record(&mut buf, &[7u8; 64]).unwrap();
        assert_eq!(read_record(&mut Cursor::new(buf), 63).unwrap(), None);
    }

    #[test]
    fn log_file_tracks_offsets_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.data");
        {
            let mut log = LogFile::open(&path, 1024, false).unwrap();
            assert_eq!(log.append(b"abc").unwrap(), 0);
            assert_eq!(log.append(b"de").unwrap(), 11);
            assert_eq!(log.len(), 21);
        }
        let mut log = LogFile::open(&path, 1024, true).unwrap();
        assert_eq!(log.len(), 21);
        assert_eq!(log.append(b"f").unwrap(), 21);

        let mut frames = log.frames_from(11).unwrap();
        assert_eq!(frames.next_frame().unwrap(), Some((11, b"de".to_vec())));
        assert_eq!(frames.next_frame().unwrap(), Some((21, b"f".to_vec())));
        assert_eq!(frames.next_frame().unwrap(), None);
    }

    #[test]
    fn oversized_append_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = LogFile::open(dir.path().join("board.head"), 4, false).unwrap();
        let err = log.append(b"too long").unwrap_err();
        assert!(matches!(err, StoreError::RecordTooLarge { len: 8, limit: 4 }));
        assert!(log.is_empty());
    }

    #[test]
    fn truncate_to_drops_later_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = LogFile::open(dir.path().join("board.page"), 64, false).unwrap();
        log.append(b"keep").unwrap();
        let mark = log.len();
        log.append(b"drop").unwrap();
        log.truncate_to(mark).unwrap();
        assert_eq!(log.len(), mark);

        let mut copy = Vec::new();
        log.copy_to(&mut copy).unwrap();
        assert_eq!(copy.len() as u64, mark);
    }

    #[test]
    fn discard_tail_realigns_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.data");
        let mut log = LogFile::open(&path, 64, false).unwrap();
        log.append(b"whole").unwrap();
        let trusted = log.len();
        log.append(b"torn").unwrap();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(trusted + 5).unwrap();

        let mut log = LogFile::open(&path, 64, false).unwrap();
        assert_eq!(log.discard_tail(trusted, false).unwrap(), 0);
        assert_eq!(log.len(), trusted + 5);
        assert_eq!(log.discard_tail(trusted, true).unwrap(), 5);
        assert_eq!(log.discard_tail(trusted, true).unwrap(), 0);
        log.append(b"after").unwrap();

        let mut frames = log.frames_from(0).unwrap();
        assert_eq!(frames.next_frame().unwrap(), Some((0, b"whole".to_vec())));
        assert_eq!(frames.next_frame().unwrap(), Some((trusted, b"after".to_vec())));
        assert_eq!(frames.next_frame().unwrap(), None);
    }
}
