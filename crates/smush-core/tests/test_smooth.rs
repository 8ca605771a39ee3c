use approx::assert_relative_eq;

use smush_core::error::SmushError;
use smush_core::smooth::{enhance_variability, normalize, SavitzkyGolay, VariabilityConfig};

#[test]
fn test_smooth_keeps_constant_series() {
    let data = vec![4.0; 20];
    let smoothed = SavitzkyGolay::default().smooth(&data);
    assert_eq!(smoothed.len(), 20);
    for v in smoothed {
        assert_relative_eq!(v, 4.0, epsilon = 1e-9);
    }
}

#[test]
fn test_smooth_keeps_quadratic_exactly() {
    let data: Vec<f64> = (0..15).map(|i| (i * i) as f64 * 0.5 - i as f64).collect();
    let smoothed = SavitzkyGolay::new(5, 2).unwrap().smooth(&data);
    for (a, b) in smoothed.iter().zip(&data) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn test_smooth_reduces_single_spike() {
    let mut data = vec![0.0; 11];
    data[5] = 10.0;
    let smoothed = SavitzkyGolay::new(7, 2).unwrap().smooth(&data);
    assert!(smoothed[5] < 10.0);
    assert!(smoothed[5] > 0.0);
}

#[test]
fn test_smooth_short_input_unchanged() {
    let data = vec![1.0, 9.0, 2.0];
    assert_eq!(SavitzkyGolay::new(5, 2).unwrap().smooth(&data), data);
}

#[test]
fn test_smooth_empty() {
    assert!(SavitzkyGolay::default().smooth(&[]).is_empty());
}

#[test]
fn test_zero_window_rejected() {
    assert!(matches!(
        SavitzkyGolay::new(0, 2),
        Err(SmushError::InvalidInput(_))
    ));
}

#[test]
fn test_normalize_range() {
    let n = normalize(&[2.0, 4.0, 6.0]);
    assert_eq!(n, vec![0.0, 0.5, 1.0]);
    assert_eq!(normalize(&[3.0, 3.0]), vec![0.0, 0.0]);
}

#[test]
fn test_enhance_spans_merge_range() {
    let config = VariabilityConfig {
        exponent: 2.0,
        min_merge: 1,
        max_merge: 50,
    };
    let levels = enhance_variability(&[0.0, 1.0, 2.0, 3.0, 4.0], &config).unwrap();
    assert_eq!(levels.first(), Some(&1));
    assert_eq!(levels.last(), Some(&50));
    assert!(levels.windows(2).all(|w| w[0] <= w[1]));
    // Squaring pushes the midpoint below the linear middle.
    assert!(levels[2] < 25);
}

#[test]
fn test_enhance_flat_series_maps_to_min() {
    let config = VariabilityConfig::default();
    let levels = enhance_variability(&[7.0; 6], &config).unwrap();
    assert_eq!(levels, vec![config.min_merge; 6]);
}

#[test]
fn test_enhance_rejects_bad_config() {
    let zero_min = VariabilityConfig {
        min_merge: 0,
        ..VariabilityConfig::default()
    };
    assert!(enhance_variability(&[1.0, 2.0], &zero_min).is_err());

    let inverted = VariabilityConfig {
        min_merge: 10,
        max_merge: 5,
        ..VariabilityConfig::default()
    };
    assert!(enhance_variability(&[1.0, 2.0], &inverted).is_err());

    let negative = VariabilityConfig {
        exponent: -1.0,
        ..VariabilityConfig::default()
    };
    assert!(enhance_variability(&[1.0, 2.0], &negative).is_err());
}

#[test]
fn test_enhance_rejects_nan() {
    let result = enhance_variability(&[1.0, f64::NAN], &VariabilityConfig::default());
    assert!(matches!(result, Err(SmushError::InvalidInput(_))));
}
