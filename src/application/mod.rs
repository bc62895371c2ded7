//! Application layer - Services that wire domain logic to ports.

pub mod archive;
pub mod intake;
pub mod pipeline;
pub mod publisher;
