use crate::common::error::AppError;

/// Fixed audio track bitrate, subtracted before allocating video bits.
pub const AUDIO_RESERVE_BPS: i64 = 128_000;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Compute the video bitrate (bits/sec) that lands the output near the
/// requested size once the audio reserve is subtracted.
///
/// Pure and deterministic: identical inputs always yield the identical
/// bitrate. Fails when the target is not strictly smaller than the source,
/// or when the size/duration ratio leaves no positive video bitrate.
pub fn plan_video_bitrate(
    source_duration_seconds: f64,
    source_size_bytes: u64,
    target_size_mb: f64,
) -> Result<u64, AppError> {
    if !source_duration_seconds.is_finite() || source_duration_seconds <= 0.0 {
        return Err(AppError::Encode(
            "Source video has no usable duration".to_string(),
        ));
    }

    let target_size_bytes = target_size_mb * BYTES_PER_MB;
    if target_size_bytes >= source_size_bytes as f64 {
        return Err(AppError::Validation(
            "Target size must be smaller than the original file size".to_string(),
        ));
    }

    let bitrate =
        (target_size_bytes * 8.0 / source_duration_seconds).floor() as i64 - AUDIO_RESERVE_BPS;
    if bitrate <= 0 {
        return Err(AppError::Encode(
            "Target size is unachievable for this video duration".to_string(),
        ));
    }

    Ok(bitrate as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vector() {
        // 500MB source, 120s, 50MB target: floor(52_428_800 * 8 / 120) - 128_000.
        let bitrate = plan_video_bitrate(120.0, 500 * 1024 * 1024, 50.0).unwrap();
        assert_eq!(bitrate, 3_367_253);
    }

    #[test]
    fn deterministic() {
        let a = plan_video_bitrate(93.7, 987_654_321, 12.5).unwrap();
        let b = plan_video_bitrate(93.7, 987_654_321, 12.5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn target_must_be_strictly_smaller() {
        let err = plan_video_bitrate(10.0, 10 * 1024 * 1024, 10.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = plan_video_bitrate(10.0, 10 * 1024 * 1024, 11.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn unachievable_bitrate_is_an_encode_error() {
        // 1MB target over 20 hours leaves nothing after the audio reserve.
        let err = plan_video_bitrate(72_000.0, 500 * 1024 * 1024, 1.0).unwrap_err();
        assert!(matches!(err, AppError::Encode(_)));
    }

    #[test]
    fn zero_duration_rejected() {
        let err = plan_video_bitrate(0.0, 1024, 0.5).unwrap_err();
        assert!(matches!(err, AppError::Encode(_)));
    }
}
