//! Domain layer - Pure business logic.

pub mod admission;
pub mod av;
pub mod scratch;
pub mod submission;
pub mod thumbnails;
