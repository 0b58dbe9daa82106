// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CBOR encoding and decoding for whiteboard records.
//!
//! Uses minicbor. Every record is a definite array whose first element is
//! the wire version; enums travel as `u8` tags and optionals as 0/1-length
//! arrays.

use core::convert::Infallible;

use minicbor::{Decoder, Encoder};
use slate_record::{
    Command, CommandKind, Header, KeyFrame, Package, PackageType, PageInfo, Payload, SceneInfo,
    SceneKind, MAX_COMMANDS,
};

/// Error returned by every decoder in this crate.
pub use minicbor::decode::Error as DecodeError;

/// Wire version written at the front of every record.
pub const WIRE_VERSION: u8 = 1;

/// Upper bound on each list inside an export [`Header`].
pub const MAX_HEADER_ENTRIES: usize = 1 << 20;

type EncodeResult<W> = Result<(), minicbor::encode::Error<<W as minicbor::encode::Write>::Error>>;

// ============================================================================
// Shared helpers
// ============================================================================

fn expect_array(d: &mut Decoder<'_>, what: &str, fields: u64) -> Result<(), DecodeError> {
    let len = d.array()?.ok_or_else(|| {
        DecodeError::message(format!("expected definite array for {what}"))
    })?;
    if len != fields {
        return Err(DecodeError::message(format!(
            "{what} expected {fields} fields, got {len}"
        )));
    }
    Ok(())
}

fn expect_version(d: &mut Decoder<'_>, what: &str) -> Result<(), DecodeError> {
    let version = d.u8()?;
    if version != WIRE_VERSION {
        return Err(DecodeError::message(format!(
            "unsupported {what} version: {version}"
        )));
    }
    Ok(())
}

fn decode_list_len(d: &mut Decoder<'_>, what: &str, max: usize) -> Result<usize, DecodeError> {
    let len = d
        .array()?
        .ok_or_else(|| DecodeError::message(format!("expected definite array for {what}")))?;
    let len = usize::try_from(len).unwrap_or(usize::MAX);
    if len > max {
        return Err(DecodeError::message(format!(
            "{what} count {len} exceeds limit {max}"
        )));
    }
    Ok(len)
}

fn decode_robust_f32(d: &mut Decoder<'_>) -> Result<f32, DecodeError> {
    match d.datatype()? {
        minicbor::data::Type::F32 => d.f32(),
        #[allow(clippy::cast_possible_truncation)]
        minicbor::data::Type::F64 => Ok(d.f64()? as f32),
        t => Err(DecodeError::message(format!("expected float, got {t:?}"))),
    }
}

// ============================================================================
// Command
// ============================================================================

fn encode_command<W: minicbor::encode::Write>(e: &mut Encoder<W>, cmd: &Command) -> EncodeResult<W> {
    e.array(5)?;
    e.u8(cmd.kind as u8)?;
    e.f32(cmd.x)?;
    e.f32(cmd.y)?;
    e.u32(cmd.color)?;
    e.f32(cmd.width)?;
    Ok(())
}

fn decode_command(d: &mut Decoder<'_>) -> Result<Command, DecodeError> {
    expect_array(d, "Command", 5)?;
    let tag = d.u8()?;
    let kind = CommandKind::from_u8(tag)
        .ok_or_else(|| DecodeError::message(format!("invalid CommandKind: {tag}")))?;
    Ok(Command {
        kind,
        x: decode_robust_f32(d)?,
        y: decode_robust_f32(d)?,
        color: d.u32()?,
        width: decode_robust_f32(d)?,
    })
}

// ============================================================================
// SceneInfo
// ============================================================================

fn encode_scene_info_inner<W: minicbor::encode::Write>(
    e: &mut Encoder<W>,
    info: &SceneInfo,
) -> EncodeResult<W> {
    e.array(6)?;
    e.u8(WIRE_VERSION)?;
    e.i32(info.index)?;
    e.u8(info.kind as u8)?;
    match &info.resource_id {
        Some(id) => {
            e.array(1)?;
            e.str(id)?;
        }
        None => {
            e.array(0)?;
        }
    }
    e.str(&info.resource_url)?;
    e.i32(info.page_count)?;
    Ok(())
}

fn decode_scene_info_inner(d: &mut Decoder<'_>) -> Result<SceneInfo, DecodeError> {
    expect_array(d, "SceneInfo", 6)?;
    expect_version(d, "SceneInfo")?;
    let index = d.i32()?;
    let tag = d.u8()?;
    let kind = SceneKind::from_u8(tag)
        .ok_or_else(|| DecodeError::message(format!("invalid SceneKind: {tag}")))?;
    let resource_id = match decode_list_len(d, "resource_id", 1)? {
        0 => None,
        _ => Some(String::from(d.str()?)),
    };
    Ok(SceneInfo {
        index,
        kind,
        resource_id,
        resource_url: String::from(d.str()?),
        page_count: d.i32()?,
    })
}

// ============================================================================
// PageInfo
// ============================================================================

fn encode_page_info_inner<W: minicbor::encode::Write>(
    e: &mut Encoder<W>,
    info: &PageInfo,
) -> EncodeResult<W> {
    e.array(7)?;
    e.u8(WIRE_VERSION)?;
    e.i32(info.scene)?;
    e.i32(info.page)?;
    e.f32(info.angle)?;
    e.f32(info.scale)?;
    e.f32(info.move_x)?;
    e.f32(info.move_y)?;
    Ok(())
}

fn decode_page_info_inner(d: &mut Decoder<'_>) -> Result<PageInfo, DecodeError> {
    expect_array(d, "PageInfo", 7)?;
    expect_version(d, "PageInfo")?;
    Ok(PageInfo {
        scene: d.i32()?,
        page: d.i32()?,
        angle: decode_robust_f32(d)?,
        scale: decode_robust_f32(d)?,
        move_x: decode_robust_f32(d)?,
        move_y: decode_robust_f32(d)?,
    })
}

// ============================================================================
// KeyFrame
// ============================================================================

fn encode_keyframe_inner<W: minicbor::encode::Write>(
    e: &mut Encoder<W>,
    kf: &KeyFrame,
) -> EncodeResult<W> {
    e.array(5)?;
    e.u8(WIRE_VERSION)?;
    e.i32(kf.scene)?;
    e.i32(kf.page)?;
    e.u64(kf.offset)?;
    e.i64(kf.timestamp)?;
    Ok(())
}

fn decode_keyframe_inner(d: &mut Decoder<'_>) -> Result<KeyFrame, DecodeError> {
    expect_array(d, "KeyFrame", 5)?;
    expect_version(d, "KeyFrame")?;
    Ok(KeyFrame {
        scene: d.i32()?,
        page: d.i32()?,
        offset: d.u64()?,
        timestamp: d.i64()?,
    })
}

// ============================================================================
// Package
// ============================================================================

fn encode_payload<W: minicbor::encode::Write>(
    e: &mut Encoder<W>,
    payload: &Payload,
) -> EncodeResult<W> {
    match payload {
        Payload::Commands(cmds) => {
            e.array(2)?;
            e.u8(0)?;
            e.array(cmds.len() as u64)?;
            for cmd in cmds {
                encode_command(e, cmd)?;
            }
        }
        Payload::Scene(info) => {
            e.array(2)?;
            e.u8(1)?;
            encode_scene_info_inner(e, info)?;
        }
        Payload::Page(info) => {
            e.array(2)?;
            e.u8(2)?;
            encode_page_info_inner(e, info)?;
        }
        Payload::Empty => {
            e.array(1)?;
            e.u8(3)?;
        }
    }
    Ok(())
}

fn decode_payload(d: &mut Decoder<'_>) -> Result<Payload, DecodeError> {
    let len = d
        .array()?
        .ok_or_else(|| DecodeError::message("expected definite array for Payload"))?;
    let tag = d.u8()?;
    let expected = if tag == 3 { 1 } else { 2 };
    if len != expected {
        return Err(DecodeError::message(format!(
            "Payload tag {tag} expected {expected} fields, got {len}"
        )));
    }
    match tag {
        0 => {
            let count = decode_list_len(d, "commands", MAX_COMMANDS)?;
            let mut cmds = Vec::with_capacity(count);
            for _ in 0..count {
                cmds.push(decode_command(d)?);
            }
            Ok(Payload::Commands(cmds))
        }
        1 => Ok(Payload::Scene(decode_scene_info_inner(d)?)),
        2 => Ok(Payload::Page(decode_page_info_inner(d)?)),
        3 => Ok(Payload::Empty),
        n => Err(DecodeError::message(format!("invalid Payload tag: {n}"))),
    }
}

fn encode_package_inner<W: minicbor::encode::Write>(
    e: &mut Encoder<W>,
    pkg: &Package,
) -> EncodeResult<W> {
    e.array(6)?;
    e.u8(WIRE_VERSION)?;
    e.u8(pkg.kind as u8)?;
    e.i32(pkg.scene)?;
    e.i32(pkg.page)?;
    e.i64(pkg.timestamp)?;
    encode_payload(e, &pkg.payload)?;
    Ok(())
}

fn decode_package_inner(d: &mut Decoder<'_>) -> Result<Package, DecodeError> {
    expect_array(d, "Package", 6)?;
    expect_version(d, "Package")?;
    let tag = d.u8()?;
    let kind = PackageType::from_u8(tag)
        .ok_or_else(|| DecodeError::message(format!("invalid PackageType: {tag}")))?;
    Ok(Package {
        kind,
        scene: d.i32()?,
        page: d.i32()?,
        timestamp: d.i64()?,
        payload: decode_payload(d)?,
    })
}

// ============================================================================
// Header
// ============================================================================

fn encode_header_inner<W: minicbor::encode::Write>(
    e: &mut Encoder<W>,
    header: &Header,
) -> EncodeResult<W> {
    e.array(6)?;
    e.u8(WIRE_VERSION)?;
    e.u32(header.version)?;
    e.i64(header.duration)?;
    e.array(header.keyframes.len() as u64)?;
    for kf in &header.keyframes {
        encode_keyframe_inner(e, kf)?;
    }
    e.array(header.pages.len() as u64)?;
    for page in &header.pages {
        encode_page_info_inner(e, page)?;
    }
    e.array(header.scenes.len() as u64)?;
    for scene in &header.scenes {
        encode_scene_info_inner(e, scene)?;
    }
    Ok(())
}

fn decode_header_inner(d: &mut Decoder<'_>) -> Result<Header, DecodeError> {
    expect_array(d, "Header", 6)?;
    expect_version(d, "Header")?;
    let version = d.u32()?;
    let duration = d.i64()?;

    let count = decode_list_len(d, "keyframes", MAX_HEADER_ENTRIES)?;
    let mut keyframes = Vec::with_capacity(count);
    for _ in 0..count {
        keyframes.push(decode_keyframe_inner(d)?);
    }
    let count = decode_list_len(d, "pages", MAX_HEADER_ENTRIES)?;
    let mut pages = Vec::with_capacity(count);
    for _ in 0..count {
        pages.push(decode_page_info_inner(d)?);
    }
    let count = decode_list_len(d, "scenes", MAX_HEADER_ENTRIES)?;
    let mut scenes = Vec::with_capacity(count);
    for _ in 0..count {
        scenes.push(decode_scene_info_inner(d)?);
    }
    Ok(Header {
        version,
        duration,
        keyframes,
        pages,
        scenes,
    })
}

// ============================================================================
// Buffer plumbing
// ============================================================================

/// Byte-counting sink used by the `packed_size_*` functions.
struct SizeCounter(usize);

impl minicbor::encode::Write for SizeCounter {
    type Error = Infallible;

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.0 += buf.len();
        Ok(())
    }
}

fn to_vec<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut Encoder<&mut Vec<u8>>) -> Result<(), minicbor::encode::Error<Infallible>>,
{
    let mut buf = Vec::new();
    let mut encoder = Encoder::new(&mut buf);
    #[allow(clippy::expect_used)]
    f(&mut encoder).expect("encoding into a Vec cannot fail");
    buf
}

fn measure<F>(f: F) -> usize
where
    F: FnOnce(&mut Encoder<SizeCounter>) -> Result<(), minicbor::encode::Error<Infallible>>,
{
    let mut encoder = Encoder::new(SizeCounter(0));
    #[allow(clippy::expect_used)]
    f(&mut encoder).expect("counting writer cannot fail");
    encoder.into_writer().0
}

fn decode_exact<'b, T>(
    bytes: &'b [u8],
    what: &str,
    f: impl FnOnce(&mut Decoder<'b>) -> Result<T, DecodeError>,
) -> Result<T, DecodeError> {
    let mut decoder = Decoder::new(bytes);
    let value = f(&mut decoder)?;
    if decoder.position() < bytes.len() {
        return Err(DecodeError::message(format!("trailing bytes in {what}")));
    }
    Ok(value)
}

// ============================================================================
// Public encode/decode functions
// ============================================================================

/// Encode a Package to CBOR bytes.
pub fn encode_package(pkg: &Package) -> Vec<u8> {
    to_vec(|e| encode_package_inner(e, pkg))
}

/// Decode a Package from CBOR bytes.
pub fn decode_package(bytes: &[u8]) -> Result<Package, DecodeError> {
    decode_exact(bytes, "Package", decode_package_inner)
}

/// Encoded length of a Package, without allocating.
pub fn packed_size_package(pkg: &Package) -> usize {
    measure(|e| encode_package_inner(e, pkg))
}

/// Encode a SceneInfo to CBOR bytes.
pub fn encode_scene_info(info: &SceneInfo) -> Vec<u8> {
    to_vec(|e| encode_scene_info_inner(e, info))
}

/// Decode a SceneInfo from CBOR bytes.
pub fn decode_scene_info(bytes: &[u8]) -> Result<SceneInfo, DecodeError> {
    decode_exact(bytes, "SceneInfo", decode_scene_info_inner)
}

/// Encoded length of a SceneInfo.
pub fn packed_size_scene_info(info: &SceneInfo) -> usize {
    measure(|e| encode_scene_info_inner(e, info))
}

/// Encode a PageInfo to CBOR bytes.
pub fn encode_page_info(info: &PageInfo) -> Vec<u8> {
    to_vec(|e| encode_page_info_inner(e, info))
}

/// Decode a PageInfo from CBOR bytes.
pub fn decode_page_info(bytes: &[u8]) -> Result<PageInfo, DecodeError> {
    decode_exact(bytes, "PageInfo", decode_page_info_inner)
}

/// Encoded length of a PageInfo.
pub fn packed_size_page_info(info: &PageInfo) -> usize {
    measure(|e| encode_page_info_inner(e, info))
}

/// Encode a KeyFrame to CBOR bytes.
pub fn encode_keyframe(kf: &KeyFrame) -> Vec<u8> {
    to_vec(|e| encode_keyframe_inner(e, kf))
}

/// Decode a KeyFrame from CBOR bytes.
pub fn decode_keyframe(bytes: &[u8]) -> Result<KeyFrame, DecodeError> {
    decode_exact(bytes, "KeyFrame", decode_keyframe_inner)
}

/// Encoded length of a KeyFrame.
pub fn packed_size_keyframe(kf: &KeyFrame) -> usize {
    measure(|e| encode_keyframe_inner(e, kf))
}

/// Encode an export Header to CBOR bytes.
pub fn encode_header(header: &Header) -> Vec<u8> {
    to_vec(|e| encode_header_inner(e, header))
}

/// Decode an export Header from CBOR bytes.
pub fn decode_header(bytes: &[u8]) -> Result<Header, DecodeError> {
    decode_exact(bytes, "Header", decode_header_inner)
}

/// Encoded length of an export Header.
pub fn packed_size_header(header: &Header) -> usize {
    measure(|e| encode_header_inner(e, header))
}
