//! Keyframer - Video intake and thumbnail derivation
//!
//! Hexagonal Architecture:
//! - domain/: Pure logic (submissions, keyframe policy, admission, av decode)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (Redis, Telegram, Catbox, in-memory)
//! - application/: Services that use ports (archive, publisher, pipeline, intake)
//! - config: Environment configuration
//!
//! A submission flows through admission, a cache lookup keyed by the platform
//! fingerprint, archival of the raw bytes, scoped decode of a handful of
//! keyframes, parallel publishing of the encoded stills and finally a cache
//! write so the next submission of the same file is served instantly.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::intake::IntakeService;
pub use application::pipeline::{PipelineError, PipelineOutcome, ThumbnailPipeline};
pub use config::AppConfig;
pub use domain::av;
