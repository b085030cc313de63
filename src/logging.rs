//! Structured merge events.
//!
//! Every record goes to the `shard_merger` target as one line of
//! `event=<name> component=<component> <fields>`. The event fixes the level,
//! so call sites only name the event, where it happened and its fields:
//!
//! | event               | level | component        | fields                                  |
//! |---------------------|-------|------------------|-----------------------------------------|
//! | `merger_created`    | debug | `driver`         | `parts`                                 |
//! | `merger_destroyed`  | debug | `driver`         | `active_sources`                        |
//! | `envelope_rejected` | warn  | `ingest`         | `buffer`, `reason`                      |
//! | `session_started`   | debug | `heap_merger`    | `order`, `sources`, `active`            |
//! | `source_exhausted`  | trace | `heap_merger`    | `source`, `active`                      |
//! | `corrupt_stream`    | warn  | `heap_merger`    | `source`, `error`                       |
//! | `session_closed`    | debug | `heap_merger`    | `reason`, `dropped_sources`             |
//! | `window_merged`     | debug | `window_merger`  | `order`, `sources`, `skip`, `limit`, `returned` |

use std::fmt;

pub(crate) const LOG_TARGET: &str = "shard_merger";

/// Part of the crate an event comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Component {
    Driver,
    Ingest,
    HeapMerger,
    WindowMerger,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Component::Driver => "driver",
            Component::Ingest => "ingest",
            Component::HeapMerger => "heap_merger",
            Component::WindowMerger => "window_merger",
        })
    }
}

/// Lifecycle points of mergers and their sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MergeEvent {
    MergerCreated,
    MergerDestroyed,
    /// A non-empty buffer without a valid payload envelope.
    EnvelopeRejected,
    SessionStarted,
    SourceExhausted,
    /// A source failed to decode mid-session; the session is closed.
    CorruptStream,
    SessionClosed,
    WindowMerged,
}

impl MergeEvent {
    pub(crate) fn name(self) -> &'static str {
        match self {
            MergeEvent::MergerCreated => "merger_created",
            MergeEvent::MergerDestroyed => "merger_destroyed",
            MergeEvent::EnvelopeRejected => "envelope_rejected",
            MergeEvent::SessionStarted => "session_started",
            MergeEvent::SourceExhausted => "source_exhausted",
            MergeEvent::CorruptStream => "corrupt_stream",
            MergeEvent::SessionClosed => "session_closed",
            MergeEvent::WindowMerged => "window_merged",
        }
    }

    pub(crate) fn level(self) -> log::Level {
        match self {
            MergeEvent::EnvelopeRejected | MergeEvent::CorruptStream => log::Level::Warn,
            // Fires once per input buffer.
            MergeEvent::SourceExhausted => log::Level::Trace,
            MergeEvent::MergerCreated
            | MergeEvent::MergerDestroyed
            | MergeEvent::SessionStarted
            | MergeEvent::SessionClosed
            | MergeEvent::WindowMerged => log::Level::Debug,
        }
    }
}

/// Emit `$event` from `$component`. Field arguments are only formatted when
/// the event's level is enabled for [`LOG_TARGET`].
macro_rules! merger_log {
    ($component:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        let event: crate::logging::MergeEvent = $event;
        let level = event.level();
        if log::log_enabled!(target: crate::logging::LOG_TARGET, level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                level,
                "event={} component={} {}",
                event.name(),
                $component,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use merger_log;
