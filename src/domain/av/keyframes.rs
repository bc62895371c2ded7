/// Default cap on stills per submission.
pub const DEFAULT_MAX_THUMBNAILS: usize = 5;

/// Picks the timestamps (seconds) to extract for a video of `duration_secs`.
///
/// Candidates in priority order: the start, the quarter points (videos over
/// 10s) and three seconds before the end (videos over 5s). The list is cut to
/// `max_count` in that order and is not re-sorted, so early strategic points
/// win over chronological completeness. Coinciding candidates are kept as-is:
/// a 12s video yields `[0, 3, 6, 9, 9]`.
pub fn select_timestamps(duration_secs: f64, max_count: usize) -> Vec<f64> {
    if !(duration_secs > 0.0) {
        return Vec::new();
    }

    let mut timestamps = vec![0.0];
    if duration_secs > 10.0 {
        timestamps.extend([
            0.25 * duration_secs,
            0.5 * duration_secs,
            0.75 * duration_secs,
        ]);
    }
    if duration_secs > 5.0 {
        timestamps.push((duration_secs - 3.0).max(0.0));
    }

    timestamps.truncate(max_count);
    timestamps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_timeline() {
        for duration in [0.0, -1.0, -120.5, f64::NAN] {
            assert!(select_timestamps(duration, 5).is_empty());
        }
    }

    #[test]
    fn test_short_video_only_start() {
        for duration in [0.1, 1.0, 4.99, 5.0] {
            assert_eq!(select_timestamps(duration, 5), vec![0.0]);
        }
    }

    #[test]
    fn test_medium_video_adds_tail() {
        assert_eq!(select_timestamps(5.5, 5), vec![0.0, 2.5]);
        assert_eq!(select_timestamps(8.0, 5), vec![0.0, 5.0]);
        assert_eq!(select_timestamps(10.0, 5), vec![0.0, 7.0]);
    }

    #[test]
    fn test_long_video_full_order() {
        assert_eq!(
            select_timestamps(100.0, 5),
            vec![0.0, 25.0, 50.0, 75.0, 97.0]
        );
    }

    #[test]
    fn test_twelve_seconds_keeps_duplicate() {
        assert_eq!(select_timestamps(12.0, 5), vec![0.0, 3.0, 6.0, 9.0, 9.0]);
    }

    #[test]
    fn test_truncation_keeps_priority_order() {
        assert_eq!(select_timestamps(100.0, 3), vec![0.0, 25.0, 50.0]);
        assert_eq!(select_timestamps(100.0, 0), Vec::<f64>::new());
        assert_eq!(select_timestamps(8.0, 1), vec![0.0]);
    }
}
