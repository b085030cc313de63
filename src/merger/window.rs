use std::{cmp::Ordering, sync::Arc};

use bytes::Bytes;

use super::{ingest, Order};
use crate::{
    error::Result,
    key_def::KeyDef,
    logging::{merger_log, Component, MergeEvent},
    option::MergeOptions,
    record::{Record, RecordShape},
    source::{source_cmp, RecordSource},
};

/// Largest result capacity reserved up front; longer windows grow on demand.
const MAX_PRESIZE: usize = 1024;

/// One-shot merge producing the `[skip, skip + limit)` window of the merged
/// sequence.
///
/// Sources live in a plain array kept sorted by their current record. After
/// the head source advances it is moved back into place with a binary search
/// and a block rotation, which is cheap for the small source counts this is
/// used with.
#[derive(Debug, Clone)]
pub struct BoundedWindowMerger {
    key_def: Arc<KeyDef>,
    shape: RecordShape,
    options: MergeOptions,
}

impl BoundedWindowMerger {
    /// Window merger ordering records by `key_def`, with default options.
    pub fn new(key_def: Arc<KeyDef>) -> Self {
        Self::with_options(key_def, MergeOptions::default())
    }

    /// Window merger ordering records by `key_def`.
    pub fn with_options(key_def: Arc<KeyDef>, options: MergeOptions) -> Self {
        Self {
            shape: RecordShape::new(key_def.clone()),
            key_def,
            options,
        }
    }

    /// Merge `buffers` and return at most `limit` records after skipping the
    /// first `skip` in merge order.
    ///
    /// Nothing is kept between calls; records outside the window are released
    /// before this returns.
    pub fn merge<I>(
        &self,
        buffers: I,
        skip: usize,
        limit: usize,
        order: Order,
    ) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = Bytes>,
    {
        let mut sources = ingest(buffers, &self.options, self.options.window_prefix_len)?;
        for source in sources.iter_mut() {
            source.shift(&self.shape)?;
        }
        let cmp = |lhs: &RecordSource, rhs: &RecordSource| {
            source_cmp(lhs, rhs, &self.key_def, order)
        };
        sources.sort_by(cmp);

        let mut records = Vec::new();
        records.try_reserve(limit.min(MAX_PRESIZE))?;
        let end = skip.saturating_add(limit);
        let mut rank = 0;
        while rank < end {
            let Some(head) = sources.first_mut() else {
                break;
            };
            let Some(record) = head.take() else {
                break;
            };
            if rank >= skip {
                records.try_reserve(1)?;
                records.push(record);
            }
            rank += 1;
            head.shift(&self.shape)?;

            if let Some((head, rest)) = sources.split_first() {
                let pos = 1 + rest.partition_point(|other| cmp(other, head) == Ordering::Less);
                sources[..pos].rotate_left(1);
            }
        }

        merger_log!(
            Component::WindowMerger,
            MergeEvent::WindowMerged,
            "order={:?} sources={} skip={} limit={} returned={}",
            order,
            sources.len(),
            skip,
            limit,
            records.len()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        envelope::EnvelopeWriter,
        error::MergeError,
        key_def::{FieldType, KeyPart},
        mp::MpValue,
    };

    fn merger() -> BoundedWindowMerger {
        BoundedWindowMerger::new(Arc::new(
            KeyDef::new(vec![KeyPart::new(0, FieldType::Integer)]).expect("key def"),
        ))
    }

    fn buffer(keys: &[i64]) -> Bytes {
        let mut writer = EnvelopeWriter::default();
        for key in keys {
            writer.push(&[MpValue::from(*key)]);
        }
        writer.finish()
    }

    fn keys(records: &[Record]) -> Vec<i64> {
        records
            .iter()
            .map(|r| r.field(0).and_then(|v| v.as_i64()).expect("key"))
            .collect()
    }

    #[test]
    fn window_skips_then_limits() {
        let records = merger()
            .merge(
                vec![buffer(&[1, 4, 7]), buffer(&[2, 5, 8]), buffer(&[3, 6, 9])],
                2,
                4,
                Order::Asc,
            )
            .expect("merge");
        assert_eq!(keys(&records), vec![3, 4, 5, 6]);
    }

    #[test]
    fn window_runs_out_before_limit() {
        let records = merger()
            .merge(vec![buffer(&[-1, 0]), buffer(&[-3])], 1, 10, Order::Asc)
            .expect("merge");
        assert_eq!(keys(&records), vec![-1, 0]);

        let records = merger()
            .merge(vec![buffer(&[2, 1]), buffer(&[3])], 5, 10, Order::Desc)
            .expect("merge");
        assert!(records.is_empty());
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let records = merger()
            .merge(vec![buffer(&[1, 2])], 0, 0, Order::Asc)
            .expect("merge");
        assert!(records.is_empty());
    }

    #[test]
    fn descending_with_uneven_sources() {
        let records = merger()
            .merge(
                vec![buffer(&[9]), Bytes::new(), buffer(&[8, 5, 1]), buffer(&[7, 6])],
                0,
                usize::MAX,
                Order::Desc,
            )
            .expect("merge");
        assert_eq!(keys(&records), vec![9, 8, 7, 6, 5, 1]);
    }

    #[test]
    fn window_prefix_is_skipped_after_the_envelope() {
        let merger = BoundedWindowMerger::with_options(
            merger().key_def.clone(),
            MergeOptions::default().window_prefix_len(2),
        );
        let mut writer = EnvelopeWriter::default();
        writer.push_raw(&[0xc3]);
        writer.push_raw(&[0xc2]);
        writer.push(&[MpValue::from(4i64)]);
        let records = merger
            .merge(vec![writer.finish()], 0, 5, Order::Asc)
            .expect("merge");
        assert_eq!(keys(&records), vec![4]);
    }

    #[test]
    fn corrupt_record_fails_the_merge() {
        let mut writer = EnvelopeWriter::default();
        writer.push(&[MpValue::from("not a number")]);
        let err = merger()
            .merge(vec![writer.finish()], 0, 1, Order::Asc)
            .expect_err("type mismatch");
        assert!(matches!(err, MergeError::CorruptStream(_)), "{err:?}");
    }
}
