//! Cursor over one ingested buffer, yielding its records in order.

use std::cmp::Ordering;

use bytes::{Buf, Bytes};

use crate::{
    error::{MergeError, Result},
    key_def::KeyDef,
    merger::Order,
    mp,
    record::{Record, RecordShape},
};

/// One input stream of a merge: the unread tail of a buffer plus the record
/// decoded from its front, if any.
#[derive(Debug)]
pub struct RecordSource {
    id: usize,
    cursor: Bytes,
    current: Option<Record>,
}

impl RecordSource {
    /// Wrap `cursor`, positioned at the first record. `id` is the buffer's
    /// position in the caller's list and breaks ties between equal keys.
    pub fn new(id: usize, cursor: Bytes) -> Self {
        Self {
            id,
            cursor,
            current: None,
        }
    }

    /// Release the current record and decode the next one, if any remain.
    ///
    /// # Errors
    /// [`MergeError::CorruptStream`] when the bytes at the cursor are not a
    /// complete record matching `shape`. The cursor is left untouched then.
    pub fn fetch(&mut self, shape: &RecordShape) -> Result<()> {
        self.current = None;
        if self.cursor.is_empty() {
            return Ok(());
        }
        let end = mp::next(&self.cursor, 0).map_err(|err| {
            MergeError::CorruptStream(format!("source {}: {err}", self.id))
        })?;
        let record = Record::decode(self.cursor.slice(..end), shape)?;
        self.cursor.advance(end);
        self.current = Some(record);
        Ok(())
    }

    /// Like [`RecordSource::fetch`], but a no-op while a record is held.
    pub fn shift(&mut self, shape: &RecordShape) -> Result<()> {
        if self.current.is_some() {
            return Ok(());
        }
        self.fetch(shape)
    }

    /// Hand the current record to the caller, leaving the slot empty.
    pub fn take(&mut self) -> Option<Record> {
        self.current.take()
    }

    /// Record at the front of the source.
    pub fn current(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Position of the source in the caller's buffer list.
    pub fn id(&self) -> usize {
        self.id
    }

    /// No current record; nothing more will be produced without a fetch.
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    /// Undecoded bytes left behind the current record.
    pub fn remaining(&self) -> usize {
        self.cursor.len()
    }
}

/// Order two sources for merging: exhausted sources sort after every active
/// one, active sources compare by their current records in `order`, and the
/// buffer position breaks ties so equal keys keep input order.
pub fn source_cmp(
    lhs: &RecordSource,
    rhs: &RecordSource,
    key_def: &KeyDef,
    order: Order,
) -> Ordering {
    match (&lhs.current, &rhs.current) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => order
            .apply(key_def.compare(l, r))
            .then_with(|| lhs.id.cmp(&rhs.id)),
    }
}
