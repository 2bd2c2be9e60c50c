use derive_more::Deref;
use getset::{CopyGetters, Getters};
use ndarray::{s, Array4};

use sonara_core::adapter::AdapterType;
use sonara_core::defined::OEM_RX_CHANNELS;
use sonara_core::sequence::ScanKind;
use sonara_driver::normalize::NormalizedSequence;
use sonara_driver::plan::Plan;

/// One demultiplexed acquisition.
///
/// The sample tensor is `[samples × channels × transmits × repetitions]`;
/// for scan-line sequences channel 0 is the first element of each line's
/// receive aperture, otherwise channels follow the probe elements.
#[derive(Clone, Debug, Deref, Getters, CopyGetters)]
pub struct RfFrame {
    #[deref]
    #[getset(get = "pub")]
    data: Array4<i16>,
    /// Record sampling frequency, in Hz.
    #[getset(get_copy = "pub")]
    rx_samp_freq: f64,
    /// First recorded sample, 1-indexed at the record rate.
    #[getset(get_copy = "pub")]
    start_sample: u32,
}

impl RfFrame {
    pub(crate) fn new(data: Array4<i16>, norm: &NormalizedSequence) -> Self {
        Self {
            data,
            rx_samp_freq: norm.rx_samp_freq(),
            start_sample: norm.start_sample(),
        }
    }
}

/// Reassembles per-module transfer buffers into the canonical tensor.
///
/// A transfer buffer is `[lanes × samples × triggers]` with the lane varying
/// fastest; firings run `(t · nSubTx + sub)` and repetitions concatenate that
/// pattern. Sub-transmits and modules unfold into the channel axis, in
/// adapter order.
pub(crate) fn demultiplex(
    buffers: &[Vec<i16>],
    norm: &NormalizedSequence,
    plan: &Plan,
    adapter: AdapterType,
    n_elem: usize,
    n_rep: usize,
) -> Array4<i16> {
    let n_oem = buffers.len();
    let n_sub = plan.n_sub_tx();
    let (n_samp, n_tx) = (norm.n_samp(), norm.n_tx());
    let full_channels = OEM_RX_CHANNELS * n_sub * n_oem;

    let full = Array4::from_shape_fn(
        (n_samp, full_channels, n_tx, n_rep),
        |(s_, g, t, r)| {
            let lane = g % OEM_RX_CHANNELS;
            let (sub, oem) = match adapter {
                AdapterType::Packed => {
                    let q = g / OEM_RX_CHANNELS;
                    (q % n_sub, q / n_sub)
                }
                AdapterType::Interleaved => {
                    let q = g / OEM_RX_CHANNELS;
                    (q / n_oem, q % n_oem)
                }
            };
            let trig = (r * n_tx + t) * n_sub + sub;
            buffers[oem][(trig * n_samp + s_) * OEM_RX_CHANNELS + lane]
        },
    );

    match norm.kind() {
        ScanKind::Sta | ScanKind::Pwi => {
            let keep = n_elem.min(full_channels);
            full.slice_move(s![.., ..keep, .., ..])
        }
        ScanKind::Lin => {
            let origin = plan.rx_origin().as_ref().expect("scan-line plan");
            match adapter {
                AdapterType::Packed => {
                    // Coarse shift slides the 32-channel window across the
                    // module boundary; the fine shift undoes the modulo-32
                    // lane rotation. Origins inside the last addressable
                    // sub-window are fully handled by the coarse shift.
                    Array4::from_shape_fn(
                        (n_samp, OEM_RX_CHANNELS, n_tx, n_rep),
                        |(s_, j, t, r)| {
                            let o = origin[t];
                            let coarse = o.saturating_sub(96).min(32);
                            let fine = if (97..=128).contains(&o) {
                                0
                            } else {
                                o % OEM_RX_CHANNELS
                            };
                            let g = ((j + fine) % OEM_RX_CHANNELS + coarse) % full_channels;
                            full[(s_, g, t, r)]
                        },
                    )
                }
                AdapterType::Interleaved => Array4::from_shape_fn(
                    (n_samp, full_channels, n_tx, n_rep),
                    |(s_, j, t, r)| full[(s_, (j + origin[t]) % full_channels, t, r)],
                ),
            }
        }
    }
}
