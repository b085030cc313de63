/// Map key tagging the data payload of a source buffer (`IPROTO_DATA`).
pub const IPROTO_DATA: u64 = 0x30;

/// Number of source slots reserved before ingestion starts.
pub const DEFAULT_SOURCE_CAPACITY: usize = 8;

/// Tunables shared by both merge strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub(crate) payload_tag: u64,
    pub(crate) window_prefix_len: usize,
    pub(crate) source_capacity: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            payload_tag: IPROTO_DATA,
            window_prefix_len: 0,
            source_capacity: DEFAULT_SOURCE_CAPACITY,
        }
    }
}

impl MergeOptions {
    /// Map key expected in every source envelope.
    pub fn payload_tag(self, payload_tag: u64) -> Self {
        MergeOptions {
            payload_tag,
            ..self
        }
    }

    /// Extra bytes skipped after the envelope by the bounded window merge.
    ///
    /// Only needed for producers that put a fixed-size prefix in front of the
    /// first record; the streaming merger ignores it.
    pub fn window_prefix_len(self, window_prefix_len: usize) -> Self {
        MergeOptions {
            window_prefix_len,
            ..self
        }
    }

    /// Initial capacity of the per-call source array.
    pub fn source_capacity(self, source_capacity: usize) -> Self {
        MergeOptions {
            source_capacity,
            ..self
        }
    }

    /// Configured envelope tag.
    pub fn get_payload_tag(&self) -> u64 {
        self.payload_tag
    }

    /// Configured window prefix length.
    pub fn get_window_prefix_len(&self) -> usize {
        self.window_prefix_len
    }

    /// Configured source capacity hint.
    pub fn get_source_capacity(&self) -> usize {
        self.source_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let options = MergeOptions::default()
            .payload_tag(0x31)
            .window_prefix_len(4)
            .source_capacity(2);
        assert_eq!(options.get_payload_tag(), 0x31);
        assert_eq!(options.get_window_prefix_len(), 4);
        assert_eq!(options.get_source_capacity(), 2);

        let defaults = MergeOptions::default();
        assert_eq!(defaults.get_payload_tag(), IPROTO_DATA);
        assert_eq!(defaults.get_window_prefix_len(), 0);
    }
}
