//! Outbound adapters: persistence, cache, and live channels.

pub mod cache;
pub mod channels;
pub mod memory;
pub mod persistence;
