mod common;

use approx::assert_relative_eq;

use smush_core::activity::{
    fingerprint, hue, score, score_frames, ActivityScores, Fingerprint, FingerprintKind,
};
use smush_core::error::SmushError;
use smush_core::frame::{DecodedImage, PixelData, PixelLayout};

use common::{moving_square, solid};

#[test]
fn test_hue_primaries() {
    assert_eq!(hue(255, 0, 0), 0);
    assert_eq!(hue(0, 255, 0), 120);
    assert_eq!(hue(0, 0, 255), 240);
    assert_eq!(hue(255, 255, 0), 60);
}

#[test]
fn test_hue_of_gray_is_zero() {
    assert_eq!(hue(0, 0, 0), 0);
    assert_eq!(hue(128, 128, 128), 0);
    assert_eq!(hue(255, 255, 255), 0);
}

#[test]
fn test_hue_just_below_red_wraps_high() {
    assert_eq!(hue(255, 0, 1), 359);
}

#[test]
fn test_hue_distance_wraps_around_the_wheel() {
    let a = Fingerprint::hue(vec![0, 10, 180]);
    let b = Fingerprint::hue(vec![359, 350, 0]);
    // 1 + 20 + 180
    assert_relative_eq!(score(&a, &b).unwrap(), 201.0 / 3.0);
}

#[test]
fn test_luma_distance_is_linear() {
    let a = Fingerprint::luma(vec![10, 0]);
    let b = Fingerprint::luma(vec![250, 255]);
    assert_relative_eq!(score(&a, &b).unwrap(), (240.0 + 255.0) / 2.0);
}

#[test]
fn test_score_rejects_size_mismatch() {
    let a = Fingerprint::hue(vec![0, 1]);
    let b = Fingerprint::hue(vec![0]);
    assert!(matches!(score(&a, &b), Err(SmushError::InvalidInput(_))));
}

#[test]
fn test_score_rejects_empty() {
    let a = Fingerprint::hue(Vec::new());
    assert!(matches!(score(&a, &a), Err(SmushError::InvalidInput(_))));
}

#[test]
fn test_score_rejects_kind_mismatch() {
    let a = Fingerprint::hue(vec![0]);
    let b = Fingerprint::luma(vec![0]);
    assert!(matches!(score(&a, &b), Err(SmushError::InvalidInput(_))));
}

#[test]
fn test_fingerprint_kind_follows_layout() {
    let colour = solid(4, 4, [200, 10, 10]);
    assert_eq!(fingerprint(&colour).kind, FingerprintKind::Hue);
    assert_eq!(fingerprint(&colour).len(), 16);

    let gray = DecodedImage::new(2, 2, PixelLayout::ByteGray, PixelData::Bytes(vec![1, 2, 3, 4]))
        .unwrap();
    let fp = fingerprint(&gray);
    assert_eq!(fp.kind, FingerprintKind::Luma);
    assert_eq!(fp.values, vec![1, 2, 3, 4]);
}

#[test]
fn test_brightness_change_scores_zero() {
    let dark = solid(8, 8, [40, 40, 40]);
    let bright = solid(8, 8, [220, 220, 220]);
    let scores = score_frames(vec![Ok(dark), Ok(bright)]).unwrap();
    assert_eq!(scores.pairs(), &[0.0]);
}

#[test]
fn test_moving_content_scores_above_static() {
    let frames = vec![
        Ok(moving_square(16, 16, 0)),
        Ok(moving_square(16, 16, 0)),
        Ok(moving_square(16, 16, 4)),
    ];
    let scores = score_frames(frames).unwrap();
    assert_eq!(scores.pairs().len(), 2);
    assert_eq!(scores.pairs()[0], 0.0);
    assert!(scores.pairs()[1] > 0.0);
}

#[test]
fn test_score_frames_stops_on_error() {
    let frames = vec![
        Ok(solid(4, 4, [1, 2, 3])),
        Err(SmushError::InvalidSer("truncated".into())),
        Ok(solid(4, 4, [1, 2, 3])),
    ];
    assert!(matches!(score_frames(frames), Err(SmushError::InvalidSer(_))));
}

#[test]
fn test_per_frame_repeats_first_pair() {
    let scores = ActivityScores::new(vec![3.0, 5.0, 7.0]);
    assert_eq!(scores.frame_count(), 4);
    assert_eq!(scores.per_frame(), vec![3.0, 3.0, 5.0, 7.0]);
    assert_relative_eq!(scores.mean(), 5.0);
    assert_relative_eq!(scores.max(), 7.0);
}

#[test]
fn test_empty_scores() {
    let scores = ActivityScores::default();
    assert_eq!(scores.frame_count(), 0);
    assert!(scores.per_frame().is_empty());
    assert_eq!(scores.mean(), 0.0);
}
