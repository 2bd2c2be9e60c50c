use getset::CopyGetters;
use ndarray::Array2;

use sonara_core::adapter::AdapterType;
use sonara_core::defined::{
    MAX_FIRINGS, MAX_TRIGGERS, OEM_DDR_BYTES, OEM_RX_CHANNELS, OEM_TX_CHANNELS,
    RX_DELAY_S, RX_PIPELINE_DELAY_SAMPLES, RX_TIME_S,
};
use sonara_core::probe::Probe;
use sonara_core::sequence::{Repetitions, ScanKind};

use crate::error::{ProgramError, SequenceError};
use crate::mask::{compress_channel_groups, encode_channel_groups, Mask};
use crate::normalize::NormalizedSequence;
use crate::oem::Oem;
use crate::plan::Plan;

/// Resolved firing counts of an uploaded sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, CopyGetters)]
pub struct FiringSchedule {
    /// Firings per repetition, `nTx · nSubTx`.
    #[getset(get_copy = "pub")]
    n_fire: usize,
    #[getset(get_copy = "pub")]
    n_rep: usize,
    /// Total trigger-table entries, `nFire · nRep`.
    #[getset(get_copy = "pub")]
    n_trig: usize,
}

/// Checks the instruction-memory, trigger-table, and DDR budgets and
/// resolves the repetition count.
pub fn schedule(
    norm: &NormalizedSequence,
    plan: &Plan,
) -> Result<FiringSchedule, SequenceError> {
    let n_fire = norm.n_tx() * plan.n_sub_tx();
    if n_fire > MAX_FIRINGS {
        return Err(SequenceError::TooManyFirings { n_fire });
    }
    let bytes_per_firing = (OEM_RX_CHANNELS * norm.n_samp() * 2) as u64;
    let n_rep = match norm.repetitions() {
        Repetitions::Count(n) => n as usize,
        Repetitions::Max => {
            let by_triggers = MAX_TRIGGERS / n_fire;
            let by_memory = (OEM_DDR_BYTES / (bytes_per_firing * n_fire as u64)) as usize;
            by_triggers.min(by_memory).max(1)
        }
    };
    let n_trig = n_fire * n_rep;
    if n_trig > MAX_TRIGGERS {
        return Err(SequenceError::TooManyTriggers { n_trig });
    }
    let required = bytes_per_firing * n_trig as u64;
    if required > OEM_DDR_BYTES {
        return Err(SequenceError::OutOfMemory { required });
    }
    Ok(FiringSchedule {
        n_fire,
        n_rep,
        n_trig,
    })
}

/// Which of the 128 channels of each module are wired to an existing
/// element; one 128-bit mask per module.
#[must_use]
pub fn active_channels(adapter: AdapterType, n_oem: usize, n_elem: usize) -> Vec<Mask> {
    (0..n_oem)
        .map(|k| {
            Mask::from_fn(OEM_TX_CHANNELS, |c| adapter.is_active(c, k, n_oem, n_elem))
        })
        .collect()
}

/// Logical receive aperture per transmit, indexed by addressable element,
/// `[128·nOEM × nTx]`.
#[must_use]
pub fn rx_aperture(
    norm: &NormalizedSequence,
    plan: &Plan,
    n_elem: usize,
    adapter: AdapterType,
    n_oem: usize,
) -> Array2<bool> {
    let rows = OEM_TX_CHANNELS * n_oem;
    match norm.kind() {
        ScanKind::Sta | ScanKind::Pwi => {
            Array2::from_shape_fn((rows, norm.n_tx()), |(e, _)| e < n_elem)
        }
        ScanKind::Lin => {
            let origin = plan.rx_origin().as_ref().expect("scan-line plan");
            let size = adapter.rx_aperture_size(n_oem);
            Array2::from_shape_fn((rows, norm.n_tx()), |(e, t)| {
                e < n_elem && e >= origin[t] && e < origin[t] + size
            })
        }
    }
}

/// Physical receive aperture of module `oem` for sub-transmit `sub` of
/// transmit `t`.
///
/// Active in-aperture channels are taken in address order and dealt into
/// consecutive groups of 32, so that no physical channel (address modulo 32)
/// serves two elements within one firing.
#[must_use]
pub fn rx_sub_aperture(
    rx_aperture: &Array2<bool>,
    active: &Mask,
    adapter: AdapterType,
    oem: usize,
    t: usize,
    sub: usize,
) -> Mask {
    let mut count = 0usize;
    Mask::from_fn(OEM_TX_CHANNELS, |c| {
        if active.get(c) && rx_aperture[(adapter.select_elem(c, oem), t)] {
            count += 1;
            (count - 1) / OEM_RX_CHANNELS == sub
        } else {
            false
        }
    })
}

/// Lowers a plan into register writes on every module: per-firing TX/RX
/// parameters, the trigger table on module 0, and the scheduled receive
/// layout. Budgets are enforced before the first hardware call.
pub fn program<O: Oem>(
    oems: &mut [O],
    norm: &NormalizedSequence,
    plan: &Plan,
    probe: &Probe,
    adapter: AdapterType,
) -> Result<FiringSchedule, ProgramError> {
    let n_oem = oems.len();
    let n_elem = probe.n_elem();
    let sched = schedule(norm, plan)?;

    let active = active_channels(adapter, n_oem, n_elem);
    let rx_ap = rx_aperture(norm, plan, n_elem, adapter, n_oem);

    for (k, oem) in oems.iter_mut().enumerate() {
        let group_mask = encode_channel_groups(&compress_channel_groups(&active[k]));
        for t in 0..norm.n_tx() {
            let tx_mask = Mask::from_fn(OEM_TX_CHANNELS, |c| {
                active[k].get(c) && plan.tx_ap_mask()[(adapter.select_elem(c, k), t)]
            });
            let tx_delays: Vec<f64> = (0..OEM_TX_CHANNELS)
                .map(|c| {
                    if active[k].get(c) {
                        plan.tx_del()[(adapter.select_elem(c, k), t)]
                    } else {
                        0.0
                    }
                })
                .collect();
            for sub in 0..plan.n_sub_tx() {
                let firing = t * plan.n_sub_tx() + sub;
                let rx_mask = rx_sub_aperture(&rx_ap, &active[k], adapter, k, t, sub);
                oem.set_tx_aperture(&tx_mask.to_hex_string(), firing)?;
                oem.set_tx_delays(&tx_delays, firing)?;
                oem.set_tx_frequency(norm.tx_frequency(), firing)?;
                oem.set_tx_half_periods(2 * norm.tx_n_periods(), firing)?;
                oem.set_tx_invert(false, firing)?;
                oem.set_active_channel_group(&group_mask, firing)?;
                oem.set_rx_aperture(&rx_mask.to_hex_string(), firing)?;
                oem.set_rx_time(RX_TIME_S, firing)?;
                oem.set_rx_delay(RX_DELAY_S, firing)?;
                oem.set_tgc_samples(norm.tgc_curve(), firing)?;
            }
        }
        oem.set_number_of_firings(sched.n_fire())?;
        oem.enable_transmit()?;
        oem.enable_receive()?;
    }

    let period_us = (norm.tx_pri() * 1e6).round() as u32;
    oems[0].set_n_triggers(sched.n_trig())?;
    for i in 0..sched.n_trig() {
        oems[0].set_trigger(period_us, false, i == sched.n_trig() - 1, i)?;
    }

    let start = norm.start_sample() + RX_PIPELINE_DELAY_SAMPLES;
    for oem in oems.iter_mut() {
        oem.clear_scheduled_receive()?;
        for i in 0..sched.n_trig() {
            oem.schedule_receive(
                i * norm.n_samp(),
                norm.n_samp(),
                start,
                norm.fs_divider() - 1,
            )?;
        }
    }

    tracing::debug!(
        n_fire = sched.n_fire(),
        n_trig = sched.n_trig(),
        n_rep = sched.n_rep(),
        "Sequence programmed"
    );
    Ok(sched)
}
