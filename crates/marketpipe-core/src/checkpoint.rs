//! Checkpoint value type: the largest successfully-persisted timestamp per
//! symbol (§3). The durable store lives in `marketpipe-repo`; this is just
//! the value the store hands back and forth.

use crate::symbol::Symbol;
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub symbol: Symbol,
    pub cursor: Timestamp,
}

impl Checkpoint {
    pub fn new(symbol: Symbol, cursor: Timestamp) -> Self {
        Self { symbol, cursor }
    }

    /// Effective start for a resumed ingest: `max(requested_start, checkpoint + 1)`.
    pub fn effective_start(checkpoint: Option<Timestamp>, requested_start: Timestamp) -> Timestamp {
        match checkpoint {
            Some(c) => Timestamp::from_nanos(std::cmp::max(requested_start.as_nanos(), c.as_nanos() + 1)),
            None => requested_start,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Nanosecond instants within a few hundred years of the epoch in
    /// either direction — wide enough to exercise ordering, narrow enough
    /// that `+ 1` on the checkpoint never overflows `i64`.
    fn nanos() -> impl Strategy<Value = i64> {
        -1_000_000_000_000_000_000i64..1_000_000_000_000_000_000i64
    }

    proptest! {
        /// `effective_start` never resumes before what was asked for, and
        /// never re-reads a bar already past the checkpoint.
        #[test]
        fn effective_start_is_never_behind_requested_or_checkpoint(
            requested in nanos(),
            maybe_checkpoint in proptest::option::of(nanos()),
        ) {
            let checkpoint = maybe_checkpoint.map(Timestamp::from_nanos);
            let eff = Checkpoint::effective_start(checkpoint, Timestamp::from_nanos(requested));

            prop_assert!(eff.as_nanos() >= requested);
            if let Some(c) = checkpoint {
                prop_assert!(eff.as_nanos() > c.as_nanos());
            }
        }

        /// Re-deriving the effective start from its own result is a no-op:
        /// once a cursor has advanced past a point, asking again from that
        /// same point never moves it backward.
        #[test]
        fn effective_start_is_idempotent_once_caught_up(
            requested in nanos(),
            checkpoint_ns in nanos(),
        ) {
            let checkpoint = Timestamp::from_nanos(checkpoint_ns);
            let first = Checkpoint::effective_start(Some(checkpoint), Timestamp::from_nanos(requested));
            let second = Checkpoint::effective_start(Some(checkpoint), first);
            prop_assert_eq!(second, first);
        }
    }
}
