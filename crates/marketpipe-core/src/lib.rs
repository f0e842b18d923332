//! marketpipe-core
//!
//! The value model for MarketPipe: `Symbol`, `Price`, `Volume`,
//! `Timestamp`, `TimeRange`, `OHLCVBar`, `IngestionJob`, `Checkpoint`,
//! `ValidationReport`, `Partition`. Pure, no I/O, no external service
//! dependencies — every constructor here total-validates its input and
//! reports a structured [`error::ValidationError`].
//!
//! Everything downstream of the HTTP adapter boundary uses these types;
//! raw vendor rows are normalized once (`marketpipe-provider`) and never
//! handed across a phase boundary as an untyped map.

pub mod bar;
pub mod checkpoint;
pub mod error;
pub mod job;
pub mod partition;
pub mod price;
pub mod symbol;
pub mod time_range;
pub mod timestamp;
pub mod validation_report;
pub mod volume;

pub use bar::{BarStatus, NewBar, Session, OHLCVBar, SCHEMA_VERSION};
pub use checkpoint::Checkpoint;
pub use error::{Cancelled, InvariantViolation, Timeout, ValidationError};
pub use job::{IngestionJob, IngestionJobId, JobState};
pub use partition::{Frame, Partition};
pub use price::Price;
pub use symbol::Symbol;
pub use time_range::TimeRange;
pub use timestamp::Timestamp;
pub use validation_report::{ValidationReport, ValidationReportRow};
pub use volume::Volume;
