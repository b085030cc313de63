use std::{
    cmp::Ordering,
    collections::{binary_heap::PeekMut, BinaryHeap},
    iter,
    sync::Arc,
};

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

/// Streaming k-way merge backed by a binary heap of sources.
///
/// A session is opened with [`HeapMerger::start`] and drained one record at a
/// time with [`HeapMerger::next`]. Each call costs `O(log N)` comparisons for
/// `N` live sources. Records with equal keys come out in buffer order.
#[derive(Debug)]
pub struct HeapMerger {
    heap: BinaryHeap<HeapSource>,
    key_def: Arc<KeyDef>,
    shape: RecordShape,
    order: Order,
    options: MergeOptions,
}

impl HeapMerger {
    /// Merger ordering records by `key_def`, with default options.
    pub fn new(key_def: Arc<KeyDef>) -> Self {
        Self::with_options(key_def, MergeOptions::default())
    }

    /// Merger ordering records by `key_def`.
    pub fn with_options(key_def: Arc<KeyDef>, options: MergeOptions) -> Self {
        Self {
            heap: BinaryHeap::new(),
            shape: RecordShape::new(key_def.clone()),
            key_def,
            order: Order::Asc,
            options,
        }
    }

    /// Open a new session over `buffers`, discarding the previous one.
    ///
    /// On error the merger is left empty and can be started again.
    pub fn start<I>(&mut self, buffers: I, order: Order) -> Result<()>
    where
        I: IntoIterator<Item = Bytes>,
    {
        self.reset();
        self.order = order;

        let sources = ingest(buffers, &self.options, 0)?;
        self.heap.try_reserve(sources.len())?;
        let total = sources.len();
        for mut source in sources {
            if let Err(err) = source.fetch(&self.shape) {
                self.teardown("start_failed");
                return Err(err);
            }
            if !source.is_exhausted() {
                self.heap.push(HeapSource {
                    source,
                    key_def: self.key_def.clone(),
                    order,
                });
            }
        }
        merger_log!(
            Component::HeapMerger,
            MergeEvent::SessionStarted,
            "order={:?} sources={} active={}",
            order,
            total,
            self.heap.len()
        );
        Ok(())
    }

    /// Next record in merge order, or `None` once every source is drained.
    ///
    /// A corrupt record tears the session down before the error is returned.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Record>> {
        let Some(mut top) = self.heap.peek_mut() else {
            return Ok(None);
        };
        let record = top.source.take();
        if let Err(err) = top.source.fetch(&self.shape) {
            let failed = PeekMut::pop(top);
            merger_log!(
                Component::HeapMerger,
                MergeEvent::CorruptStream,
                "source={} error=\"{}\"",
                failed.source.id(),
                err
            );
            self.teardown("corrupt_stream");
            return Err(err);
        }
        if top.source.is_exhausted() {
            let done = PeekMut::pop(top);
            merger_log!(
                Component::HeapMerger,
                MergeEvent::SourceExhausted,
                "source={} active={}",
                done.source.id(),
                self.heap.len()
            );
        }
        // Dropping `top` otherwise re-sifts the refilled source.
        Ok(record)
    }

    /// Compare the next record against an encoded key, in merge order.
    ///
    /// Negative means the next record comes before `key`. Returns `None` when
    /// the merger is empty; no record is consumed.
    pub fn compare_top_to_key(&self, key: &[u8]) -> Result<Option<Ordering>> {
        let Some(record) = self.heap.peek().and_then(|top| top.source.current()) else {
            return Ok(None);
        };
        let ord = self.key_def.compare_with_key(record, key)?;
        Ok(Some(self.order.apply(ord)))
    }

    /// Iterate the remaining records, stopping after the first error.
    pub fn drain(&mut self) -> impl Iterator<Item = Result<Record>> + '_ {
        let mut failed = false;
        iter::from_fn(move || {
            if failed {
                return None;
            }
            let item = self.next().transpose();
            failed = matches!(item, Some(Err(_)));
            item
        })
    }

    /// Whether no source has records left.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Sources that still hold a record.
    pub fn active_sources(&self) -> usize {
        self.heap.len()
    }

    /// Direction of the current session.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Key definition records are ordered by.
    pub fn key_def(&self) -> &Arc<KeyDef> {
        &self.key_def
    }

    fn reset(&mut self) {
        if !self.heap.is_empty() {
            self.teardown("session_replaced");
        }
    }

    fn teardown(&mut self, reason: &str) {
        merger_log!(
            Component::HeapMerger,
            MergeEvent::SessionClosed,
            "reason={} dropped_sources={}",
            reason,
            self.heap.len()
        );
        self.heap.clear();
    }
}

#[derive(Debug)]
struct HeapSource {
    source: RecordSource,
    key_def: Arc<KeyDef>,
    order: Order,
}

impl Ord for HeapSource {
    fn cmp(&self, other: &Self) -> Ordering {
        // `BinaryHeap` pops the greatest element; flip so the first source in
        // merge order sits on top.
        source_cmp(&other.source, &self.source, &self.key_def, self.order)
    }
}

impl PartialOrd for HeapSource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapSource {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapSource {}
