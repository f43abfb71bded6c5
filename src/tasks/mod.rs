//! Background Tasks Module
//!
//! # Tasks
//! - TTL Sweep: removes expired entries from each cache region in turn

mod cleanup;

pub use cleanup::{spawn_cleanup_task, sweep_region};
