//! Fallback values for optional configuration fields.
//!
//! # Design
//! - Keep serde defaults in one place so documents and code agree.

#![allow(clippy::redundant_pub_crate)]

use std::num::NonZeroUsize;

/// Level used when a document does not name one.
pub(crate) const LOG_LEVEL: &str = "info";
/// Messages a channel-backed collector buffers before rejecting new ones.
pub(crate) const COLLECTOR_QUEUE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(4_096) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

pub(crate) fn log_level() -> String {
    LOG_LEVEL.to_string()
}

pub(crate) const fn collector_queue_capacity() -> NonZeroUsize {
    COLLECTOR_QUEUE_CAPACITY
}
