// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Combined single-file export: `[u64 len][Header][data log bytes]`.
//!
//! Keyframe offsets in the header are relative to the start of the embedded
//! data log, which is a byte-for-byte copy of `<name>.data`.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::Path;

use slate_record::Header;
use slate_record_codec::{decode_header, encode_header};
use tracing::info;

use crate::config::DEFAULT_MAX_RECORD_LEN;
use crate::directory::PageRef;
use crate::frame::{read_record, write_record, FrameReader, LogFile, LEN_PREFIX};
use crate::view::{replay_page, PageView};
use crate::StoreError;

/// Header `version` written by this engine.
pub const EXPORT_VERSION: u32 = 1;

/// Write the export to `path`, replacing any previous file.
pub(crate) fn write_export(path: &Path, header: &Header, data: &LogFile) -> Result<(), StoreError> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".partial");
    let mut out = BufWriter::new(File::create(&staging)?);
    write_record(&mut out, &encode_header(header))?;
    let copied = data.copy_to(&mut out)?;
    out.into_inner().map_err(std::io::IntoInnerError::into_error)?.sync_all()?;
    fs::rename(&staging, path)?;
    info!(
        path = %path.display(),
        keyframes = header.keyframes.len(),
        scenes = header.scenes.len(),
        data_len = copied,
        "export written"
    );
    Ok(())
}

/// Read-only view of an exported whiteboard.
#[derive(Debug)]
pub struct ExportReader {
    header: Header,
    data: Vec<u8>,
    max_record_len: u64,
}

impl ExportReader {
    /// Load and parse an export file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_bytes(fs::read(path)?, DEFAULT_MAX_RECORD_LEN)
    }

    /// Parse an export held in memory.
    pub fn from_bytes(bytes: Vec<u8>, max_record_len: u64) -> Result<Self, StoreError> {
        let mut cursor = Cursor::new(bytes.as_slice());
        let Some(head) = read_record(&mut cursor, max_record_len)? else {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "export header is truncated",
            )));
        };
        let header = decode_header(&head)?;
        let start = LEN_PREFIX as usize + head.len();
        let data = bytes.get(start..).unwrap_or_default().to_vec();
        Ok(Self {
            header,
            data,
            max_record_len,
        })
    }

    /// Parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Embedded data log.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Rebuild one page from the embedded log, starting at its keyframe.
    pub fn page_view(&self, scene: i32, page: i32) -> Result<PageView, StoreError> {
        let at = self.resolve(scene, page)?;
        let transform = self
            .header
            .pages
            .iter()
            .rev()
            .find(|p| p.scene == scene && p.page == page)
            .copied()
            .unwrap_or_else(|| at.default_info());
        let offset = self
            .header
            .keyframes
            .iter()
            .rev()
            .find(|kf| kf.scene == scene && kf.page == page)
            .map_or(0, |kf| kf.offset);

        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let mut frames = FrameReader::new(
            Cursor::new(&self.data[start..]),
            offset,
            self.max_record_len,
        );
        Ok(replay_page(&mut frames, at, transform)?.pack())
    }

    fn resolve(&self, scene: i32, page: i32) -> Result<PageRef, StoreError> {
        let count = self.header.scenes.len();
        let entry = usize::try_from(scene)
            .ok()
            .and_then(|i| self.header.scenes.get(i).map(|s| (i, s)));
        let Some((scene_idx, info)) = entry else {
            return Err(StoreError::InvalidScene { scene, count });
        };
        let page_count = usize::try_from(info.page_count).unwrap_or(0);
        match usize::try_from(page).ok().filter(|p| *p < page_count) {
            Some(page_idx) => Ok(PageRef::new(scene_idx, page_idx)),
            None => Err(StoreError::InvalidPage {
                scene,
                page,
                page_count,
            }),
        }
    }
}
