// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CBOR codec for slate-record.
//!
//! This crate provides encode/decode and `packed_size` for every record the
//! whiteboard engine writes: packages, scene and page descriptors, keyframes
//! and the export header.
//!
//! # Design
//!
//! Serialization is deliberately separated from the record types.
//! This keeps slate-record pure and dependency-free.

mod cbor;

pub use cbor::*;
