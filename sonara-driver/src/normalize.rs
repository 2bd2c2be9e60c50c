use getset::{CopyGetters, Getters};

use sonara_core::defined::{MAX_SAMPLES_CLOCK_PRODUCT, SAMPLE_ALIGNMENT, SAMPLING_CLOCK_HZ};
use sonara_core::probe::Probe;
use sonara_core::sequence::{
    ApertureCenter, Repetitions, RxWindow, ScanKind, TxRxSequence,
};

use crate::error::SequenceError;
use crate::tgc::tgc_curve;

/// A validated acquisition request with every per-transmit field
/// materialized and the receive window resolved to samples.
#[derive(Clone, Debug, PartialEq, Getters, CopyGetters)]
pub struct NormalizedSequence {
    #[getset(get_copy = "pub")]
    kind: ScanKind,
    #[getset(get_copy = "pub")]
    n_tx: usize,
    /// Record sampling frequency, in Hz.
    #[getset(get_copy = "pub")]
    rx_samp_freq: f64,
    /// First recorded sample, 1-indexed at the record rate.
    #[getset(get_copy = "pub")]
    start_sample: u32,
    #[getset(get_copy = "pub")]
    n_samp: usize,
    /// Transmit aperture centers, in meters.
    #[getset(get = "pub")]
    tx_ap_cent: Vec<f64>,
    /// Transmit aperture centers, as fractional element indices.
    #[getset(get = "pub")]
    tx_cent_elem: Vec<f64>,
    /// Transmit aperture widths, in elements.
    #[getset(get = "pub")]
    tx_ap_size: Vec<usize>,
    /// Focal depths, in meters.
    #[getset(get = "pub")]
    tx_focus: Vec<f64>,
    /// Steering angles, in radians.
    #[getset(get = "pub")]
    tx_angle: Vec<f64>,
    #[getset(get_copy = "pub")]
    speed_of_sound: f64,
    #[getset(get_copy = "pub")]
    tx_frequency: f64,
    #[getset(get_copy = "pub")]
    tx_n_periods: u32,
    #[getset(get_copy = "pub")]
    tx_pri: f64,
    #[getset(get_copy = "pub")]
    repetitions: Repetitions,
    #[getset(get_copy = "pub")]
    fs_divider: u32,
    /// TGC curve normalized to `[0, 1]`.
    #[getset(get = "pub")]
    tgc_curve: Vec<f64>,
}

/// Validates a request against a probe and materializes all defaults.
pub fn normalize(
    seq: &TxRxSequence,
    probe: &Probe,
) -> Result<NormalizedSequence, SequenceError> {
    if seq.fs_divider < 1 {
        return Err(SequenceError::FsDividerInvalid);
    }
    if !(seq.speed_of_sound.is_finite() && seq.speed_of_sound > 0.0) {
        return Err(SequenceError::SpeedOfSoundInvalid(seq.speed_of_sound));
    }
    if !(seq.tx_frequency.is_finite() && seq.tx_frequency > 0.0) {
        return Err(SequenceError::TxFrequencyInvalid(seq.tx_frequency));
    }
    if seq.tx_n_periods < 1 {
        return Err(SequenceError::TxPeriodsInvalid);
    }
    if !(seq.tx_pri.is_finite() && seq.tx_pri > 0.0) {
        return Err(SequenceError::TxPriInvalid(seq.tx_pri));
    }
    if seq.repetitions == Repetitions::Count(0) {
        return Err(SequenceError::RepetitionsInvalid);
    }

    let n_tx = match seq.kind {
        ScanKind::Pwi => seq.angle.len().unwrap_or(1),
        ScanKind::Lin | ScanKind::Sta => match &seq.aperture_center {
            ApertureCenter::Element(c) | ApertureCenter::Position(c) => c.len().unwrap_or(1),
        },
    };
    if n_tx == 0 {
        return Err(SequenceError::NoTransmits);
    }

    let tx_angle = seq.angle.materialize(n_tx)?;
    let tx_focus = seq.focus.materialize(n_tx)?;
    let tx_ap_size = seq.aperture_size.materialize(n_tx)?;
    for &size in &tx_ap_size {
        if size < 1 || size > probe.n_elem() {
            return Err(SequenceError::ApertureSizeOutOfRange {
                size,
                n_elem: probe.n_elem(),
            });
        }
    }
    let (tx_ap_cent, tx_cent_elem): (Vec<f64>, Vec<f64>) = match &seq.aperture_center {
        ApertureCenter::Element(c) => {
            let idx = c.materialize(n_tx)?;
            (idx.iter().map(|&i| probe.x_at(i)).collect(), idx)
        }
        ApertureCenter::Position(c) => {
            let x = c.materialize(n_tx)?;
            let idx = x.iter().map(|&x| probe.element_at(x)).collect();
            (x, idx)
        }
    };

    let rx_samp_freq = SAMPLING_CLOCK_HZ / seq.fs_divider as f64;
    let (start_sample, n_samp) = match seq.rx_window {
        RxWindow::DepthRange { min, max } => {
            if !(min.is_finite() && max.is_finite() && min >= 0.0 && max > min) {
                return Err(SequenceError::DepthRangeInvalid { min, max });
            }
            let sample_at =
                |z: f64| (2.0 * rx_samp_freq * z / seq.speed_of_sound).round() as u32 + 1;
            let (s0, s1) = (sample_at(min), sample_at(max));
            let n_samp = (s1 - s0 + 1) as usize;
            (s0, n_samp.div_ceil(SAMPLE_ALIGNMENT) * SAMPLE_ALIGNMENT)
        }
        RxWindow::Samples { first, last } => {
            if first < 1 || last < first {
                return Err(SequenceError::SampleRangeInvalid { first, last });
            }
            let n_samp = (last - first + 1) as usize;
            if n_samp % SAMPLE_ALIGNMENT != 0 {
                return Err(SequenceError::SamplesNotAligned { n_samp });
            }
            (first, n_samp)
        }
    };
    let limit = MAX_SAMPLES_CLOCK_PRODUCT / seq.fs_divider as usize;
    if n_samp > limit {
        return Err(SequenceError::SamplesOutOfRange { n_samp, limit });
    }

    let (tgc, clamped) = tgc_curve(
        seq.tgc_start,
        seq.tgc_slope,
        seq.speed_of_sound,
        rx_samp_freq,
        seq.fs_divider,
        start_sample,
        n_samp,
    );
    if clamped {
        tracing::warn!(
            tgc_start = seq.tgc_start,
            tgc_slope = seq.tgc_slope,
            "TGC curve clamped to the [14, 54] dB DAC range"
        );
    }

    Ok(NormalizedSequence {
        kind: seq.kind,
        n_tx,
        rx_samp_freq,
        start_sample,
        n_samp,
        tx_ap_cent,
        tx_cent_elem,
        tx_ap_size,
        tx_focus,
        tx_angle,
        speed_of_sound: seq.speed_of_sound,
        tx_frequency: seq.tx_frequency,
        tx_n_periods: seq.tx_n_periods,
        tx_pri: seq.tx_pri,
        repetitions: seq.repetitions,
        fs_divider: seq.fs_divider,
        tgc_curve: tgc,
    })
}
