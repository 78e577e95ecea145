//! Stateless request handlers behind the protocol router.
mod annotation_writer;
mod codriver;
mod stage_times;

pub use annotation_writer::*;
pub use codriver::*;
pub use stage_times::*;
