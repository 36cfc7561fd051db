//! Shared utilities

pub mod emitter;
pub mod id;
pub mod rate_limit;
pub mod time;
