//! Redis adapter for the metadata store.
//!
//! This module provides Redis-backed implementations of:
//! - `ThumbnailCache`: one JSON value per fingerprint written with `SET NX`,
//!   plus sorted-set indexes by submitter and creation time
//! - `ArchiveRepository`: one JSON value per reference, a creation-time
//!   sorted set and hash indexes by channel message id and source fingerprint

mod archive;
mod cache;
mod error;
mod pool;

pub use error::StoreError;
pub use pool::RedisPool;

/// Redis key constants
const THUMBS_PREFIX: &str = "keyframer:thumbs:";
const THUMBS_BY_SUBMITTER_PREFIX: &str = "keyframer:submitter_thumbs:";
const THUMBS_BY_CREATED: &str = "keyframer:thumbs_by_created";
const ARCHIVE_PREFIX: &str = "keyframer:archive:";
const ARCHIVE_BY_CREATED: &str = "keyframer:archive_by_created";
const ARCHIVE_BY_MESSAGE: &str = "keyframer:archive_by_message";
const ARCHIVE_BY_SOURCE: &str = "keyframer:archive_by_source";

fn thumbs_key(fingerprint: &str) -> String {
    format!("{}{}", THUMBS_PREFIX, fingerprint)
}

fn submitter_key(submitter: i64) -> String {
    format!("{}{}", THUMBS_BY_SUBMITTER_PREFIX, submitter)
}

fn archive_key(id: impl std::fmt::Display) -> String {
    format!("{}{}", ARCHIVE_PREFIX, id)
}

/// Sorted-set score for a creation time.
fn score(at: &chrono::DateTime<chrono::Utc>) -> i64 {
    at.timestamp_millis()
}

/// Pool for tests that need a live server, taken from
/// `KEYFRAMER_TEST_REDIS_URL`. Such tests return early when it is unset.
#[cfg(test)]
pub(crate) fn live_pool() -> Option<RedisPool> {
    let url = std::env::var("KEYFRAMER_TEST_REDIS_URL").ok()?;
    RedisPool::new(&url).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_key_layout() {
        assert_eq!(thumbs_key("AgADxyz"), "keyframer:thumbs:AgADxyz");
        assert_eq!(submitter_key(-1001), "keyframer:submitter_thumbs:-1001");
        let id = uuid::Uuid::nil();
        assert_eq!(
            archive_key(id),
            "keyframer:archive:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_score_orders_by_time() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        assert_eq!(score(&later) - score(&earlier), 1000);
    }
}
