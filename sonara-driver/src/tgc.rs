use sonara_core::defined::{TGC_MAX_DB, TGC_MIN_DB};

/// Measured response of the TGC DAC at integer gain settings of 14..54 dB.
///
/// Entry `i` is the gain actually produced when `14 + i` dB is requested;
/// requested curves are pre-warped through the inverse of this table.
const TGC_CHARACTERISTIC: [f64; 41] = [
    14.000, 14.001, 14.002, 14.003, 14.024, 14.168, 14.480, 14.825, 15.234, 15.770, 16.508,
    17.382, 18.469, 19.796, 20.933, 21.862, 22.891, 24.099, 25.543, 26.596, 27.651, 28.837,
    30.265, 31.690, 32.843, 34.045, 35.543, 37.184, 38.460, 39.680, 41.083, 42.740, 44.269,
    45.540, 46.936, 48.474, 49.895, 50.966, 52.083, 53.256, 54.000,
];

/// Hardware TGC sample grid: the first sample sits at clock tick 400 and the
/// rest follow every 150 ticks, both scaled down by the clock divider.
fn sample_grid(fs_divider: u32, start_sample: u32, n_samp: usize) -> Vec<u32> {
    let first = (400.0 / fs_divider as f64).round() as u32;
    let step = (150.0 / fs_divider as f64).round() as u32;
    let last = start_sample + n_samp as u32 - 1;
    (0u32..)
        .map(|n| first + n * step)
        .skip_while(|&s| s < start_sample)
        .take_while(|&s| s <= last)
        .collect()
}

/// Builds the TGC curve programmed into the modules, normalized to `[0, 1]`.
///
/// Returns the curve and whether any point had to be clamped into the DAC
/// gain range.
#[must_use]
pub fn tgc_curve(
    tgc_start_db: f64,
    tgc_slope_db_per_m: f64,
    speed_of_sound: f64,
    rx_samp_freq: f64,
    fs_divider: u32,
    start_sample: u32,
    n_samp: usize,
) -> (Vec<f64>, bool) {
    let mut clamped = false;
    let curve = sample_grid(fs_divider, start_sample, n_samp)
        .into_iter()
        .map(|s| {
            let depth = s as f64 / rx_samp_freq * speed_of_sound;
            let gain = tgc_start_db + tgc_slope_db_per_m * depth;
            if !(TGC_MIN_DB..=TGC_MAX_DB).contains(&gain) {
                clamped = true;
            }
            let gain = gain.clamp(TGC_MIN_DB, TGC_MAX_DB);
            (linearize(gain) - TGC_MIN_DB) / (TGC_MAX_DB - TGC_MIN_DB)
        })
        .collect();
    (curve, clamped)
}

/// Inverts the DAC characteristic: finds the setting that produces `gain`.
fn linearize(gain: f64) -> f64 {
    let i = TGC_CHARACTERISTIC
        .partition_point(|&v| v < gain)
        .clamp(1, TGC_CHARACTERISTIC.len() - 1);
    let (lo, hi) = (TGC_CHARACTERISTIC[i - 1], TGC_CHARACTERISTIC[i]);
    TGC_MIN_DB + (i - 1) as f64 + (gain - lo) / (hi - lo)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn characteristic_is_monotone() {
        assert!(TGC_CHARACTERISTIC.windows(2).all(|w| w[0] < w[1]));
    }

    #[rstest]
    #[case(14.0, 14.0)]
    #[case(54.0, 54.0)]
    #[case(24.099, 31.0)]
    fn linearize_hits_the_knots(#[case] gain: f64, #[case] expected: f64) {
        approx::assert_abs_diff_eq!(expected, linearize(gain), epsilon = 1e-9);
    }

    #[test]
    fn grid_starts_at_tick_400_and_steps_by_150() {
        let grid = sample_grid(1, 1, 4544);
        assert_eq!(400, grid[0]);
        assert_eq!(550, grid[1]);
        assert!(*grid.last().unwrap() <= 4544);
        assert!(grid.len() > 20);
    }

    #[test]
    fn grid_scales_with_the_divider() {
        let grid = sample_grid(2, 1, 1024);
        assert_eq!(200, grid[0]);
        assert_eq!(275, grid[1]);
    }

    #[test]
    fn flat_curve_below_range_clamps_to_zero() {
        let (curve, clamped) = tgc_curve(5.0, 0.0, 1540.0, 65e6, 1, 1, 4096);
        assert!(clamped);
        assert!(!curve.is_empty());
        assert!(curve.iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn curve_is_monotone_for_positive_slope() {
        let (curve, _) = tgc_curve(14.0, 400.0, 1540.0, 65e6, 1, 1, 4096);
        assert!(curve.windows(2).all(|w| w[0] <= w[1]));
        assert!(curve.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
