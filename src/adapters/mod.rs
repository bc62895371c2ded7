//! Adapters - Concrete implementations of ports.

pub mod catbox;
pub mod memory;
pub mod redis;
pub mod telegram;
