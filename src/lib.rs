#![deny(missing_docs)]
//! Streaming k-way merge of sorted MessagePack tuple streams.
//!
//! Each input buffer holds records already sorted by a caller-supplied key
//! definition, wrapped in a `{tag: [record, ...]}` envelope. Two strategies
//! combine them into one ordered sequence:
//!
//! - [`HeapMerger`]: resumable session, one record per [`HeapMerger::next`]
//!   call, with a peek-style [`HeapMerger::compare_top_to_key`].
//! - [`BoundedWindowMerger`]: one call returning a `skip`/`limit` page.
//!
//! ```
//! use std::sync::Arc;
//!
//! use shard_merger::{
//!     EnvelopeWriter, FieldType, HeapMerger, KeyDef, KeyPart, MpValue, Order,
//! };
//!
//! let key_def = Arc::new(KeyDef::new(vec![KeyPart::new(0, FieldType::Unsigned)])?);
//! let mut odd = EnvelopeWriter::default();
//! odd.push(&[MpValue::from(1u64)]).push(&[MpValue::from(3u64)]);
//! let mut even = EnvelopeWriter::default();
//! even.push(&[MpValue::from(2u64)]);
//!
//! let mut merger = HeapMerger::new(key_def);
//! merger.start(vec![odd.finish(), even.finish()], Order::Asc)?;
//! let mut keys = Vec::new();
//! while let Some(record) = merger.next()? {
//!     keys.extend(record.field(0).and_then(|v| v.as_u64()));
//! }
//! assert_eq!(keys, [1, 2, 3]);
//! # Ok::<(), shard_merger::MergeError>(())
//! ```

mod logging;

/// Scripting-host entry points taking dynamically typed arguments.
pub mod driver;
/// Source buffer envelope validation and construction.
pub mod envelope;
/// Error types.
pub mod error;
/// Key definitions and comparison rules.
pub mod key_def;
/// Merge strategies.
pub mod merger;
/// MessagePack primitives.
pub mod mp;
/// Merge tunables.
pub mod option;
/// Decoded records.
pub mod record;
/// Per-buffer record cursors.
pub mod source;

pub use crate::{
    envelope::{EnvelopeError, EnvelopeWriter},
    error::{MergeError, Result},
    key_def::{Collation, FieldType, KeyDef, KeyPart, COLL_NONE},
    merger::{BoundedWindowMerger, HeapMerger, Order},
    mp::MpValue,
    option::{MergeOptions, IPROTO_DATA},
    record::{Record, RecordShape},
    source::RecordSource,
};
