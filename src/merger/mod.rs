//! Merge strategies over sorted source buffers.
//!
//! [`HeapMerger`] keeps a session open and hands out one record per call,
//! [`BoundedWindowMerger`] produces one `skip`/`limit` window in a single
//! pass. Both ingest buffers the same way: empty buffers are ignored, every
//! other buffer must carry the payload envelope.

mod heap;
mod window;

use std::cmp::Ordering;

use bytes::{Buf, Bytes};
pub use heap::HeapMerger;
pub use window::BoundedWindowMerger;

use crate::{
    envelope,
    error::{MergeError, Result},
    logging::{merger_log, Component, MergeEvent},
    option::MergeOptions,
    source::RecordSource,
};

/// Direction of a merge.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Order {
    /// Ascending (least key first).
    #[default]
    Asc,
    /// Descending (greatest key first).
    Desc,
}

impl Order {
    /// Direction from a sign: non-negative is ascending.
    pub fn from_sign(sign: i64) -> Self {
        if sign >= 0 {
            Order::Asc
        } else {
            Order::Desc
        }
    }

    /// `1` for ascending, `-1` for descending.
    pub fn sign(self) -> i32 {
        match self {
            Order::Asc => 1,
            Order::Desc => -1,
        }
    }

    /// Map a key ordering into merge order.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    }
}

/// Turn `buffers` into sources positioned at their first record.
///
/// `extra_prefix` bytes after the envelope are skipped as well. Any envelope
/// failure drops the sources built so far.
pub(crate) fn ingest<I>(
    buffers: I,
    options: &MergeOptions,
    extra_prefix: usize,
) -> Result<Vec<RecordSource>>
where
    I: IntoIterator<Item = Bytes>,
{
    let mut sources = Vec::new();
    sources.try_reserve(options.source_capacity)?;
    for (buffer, mut bytes) in buffers.into_iter().enumerate() {
        if bytes.is_empty() {
            continue;
        }
        let header = envelope::strip(&bytes, options.payload_tag).map_err(|err| {
            merger_log!(
                Component::Ingest,
                MergeEvent::EnvelopeRejected,
                "buffer={} reason=\"{}\"",
                buffer,
                err
            );
            MergeError::InvalidEnvelope {
                buffer,
                reason: err.to_string(),
            }
        })?;
        let skip = header + extra_prefix;
        if skip > bytes.len() {
            return Err(MergeError::InvalidEnvelope {
                buffer,
                reason: format!(
                    "prefix of {extra_prefix} bytes runs past the end of a {} byte buffer",
                    bytes.len()
                ),
            });
        }
        bytes.advance(skip);
        sources.try_reserve(1)?;
        sources.push(RecordSource::new(buffer, bytes));
    }
    Ok(sources)
}
