//! Service layer: the scheduling engine proper.
//!
//! Services orchestrate repository calls and implement the business logic:
//! recurring expansion, calendar aggregation, day-schedule optimization,
//! and the batch job tying them together.

pub mod batch;

pub mod calendar;

pub mod expansion;

pub mod optimizer;

pub use batch::expand_all_due;
pub use calendar::{compute_window, fetch_window, fetch_window_blocking, highlight_series};
pub use expansion::{expand_series, generate_instances};
pub use optimizer::{optimize_schedule, request_fingerprint};
