//! marketpipe-events
//!
//! In-process, single-machine publish/subscribe decoupling the
//! ingestion -> validation -> aggregation phases (§4.7). No delivery
//! guarantees beyond synchronous in-process fan-out.

pub mod bus;
pub mod event;

pub use bus::EventBus;
pub use event::{Event, EventKind, ValidationSummaryPayload};
