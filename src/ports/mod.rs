//! Ports - Trait definitions implemented by adapters.

pub mod archive;
pub mod cache;
pub mod files;
pub mod hosting;
pub mod notifier;
