//! Progress fan-out for orchestrated operations.
//!
//! - [`ProgressBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, carrying [`OperationEvent`]s.
//! - [`OperationProgress`]: a [`ProgressSink`](brandcfg_core::progress::ProgressSink)
//!   bound to one operation id, handed to workflows.

pub mod bus;

pub use bus::{OperationEvent, OperationProgress, ProgressBus};
