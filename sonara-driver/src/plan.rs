use getset::{CopyGetters, Getters};
use ndarray::Array2;

use sonara_core::adapter::AdapterType;
use sonara_core::defined::{MAX_SUB_TRANSMITS, OEM_RX_CHANNELS, OEM_TX_CHANNELS};
use sonara_core::probe::Probe;
use sonara_core::sequence::ScanKind;

use crate::error::SequenceError;
use crate::normalize::NormalizedSequence;

/// Transmit apertures and delay profiles of a sequence, aligned with the
/// physical TX channel rows of the module stack.
#[derive(Clone, Debug, Getters, CopyGetters)]
pub struct Plan {
    /// Aperture membership, `[128·nOEM × nTx]`.
    #[getset(get = "pub")]
    tx_ap_mask: Array2<bool>,
    /// Transmit delays in seconds, `[128·nOEM × nTx]`; zero outside the
    /// aperture.
    #[getset(get = "pub")]
    tx_del: Array2<f64>,
    /// Delay at each aperture center; equal across transmits after
    /// alignment.
    #[getset(get = "pub")]
    tx_del_cent: Vec<f64>,
    /// Physical receive apertures needed to cover the logical one.
    #[getset(get_copy = "pub")]
    n_sub_tx: usize,
    /// First element of the receive aperture per transmit (scan-line modes
    /// only), 0-based.
    #[getset(get = "pub")]
    rx_origin: Option<Vec<usize>>,
}

/// Computes TX aperture masks, delay profiles, and the sub-transmit count.
pub fn plan(
    norm: &NormalizedSequence,
    probe: &Probe,
    adapter: AdapterType,
    n_oem: usize,
) -> Result<Plan, SequenceError> {
    let n_elem = probe.n_elem();
    let n_tx = norm.n_tx();
    let rows = OEM_TX_CHANNELS * n_oem;
    let c = norm.speed_of_sound();
    // Guards the boundary elements of apertures whose edge falls exactly on
    // an element center.
    let eps = probe.pitch() * 1e-6;

    let mut tx_ap_mask = Array2::from_elem((rows, n_tx), false);
    let mut tx_del = Array2::zeros((rows, n_tx));
    let mut tx_del_cent = vec![0.0; n_tx];

    for t in 0..n_tx {
        let cent_x = norm.tx_ap_cent()[t];
        let angle = norm.tx_angle()[t];
        let focus = norm.tx_focus()[t];
        let half = (norm.tx_ap_size()[t] as f64 - 1.0) / 2.0 * probe.pitch();

        for e in 0..n_elem {
            tx_ap_mask[(e, t)] = (probe.x_elem(e) - cent_x).abs() <= half + eps;
        }

        if focus.is_infinite() {
            for e in 0..n_elem {
                tx_del[(e, t)] = probe.x_elem(e) * angle.sin() / c;
            }
            tx_del_cent[t] = cent_x * angle.sin() / c;
        } else {
            let x_foc = focus * angle.sin() + cent_x;
            let z_foc = focus * angle.cos();
            // A focal point in front of the array inverts the profile:
            // distant elements must fire earlier.
            let foc_defoc = if z_foc > 0.0 { -1.0 } else { 1.0 };
            for e in 0..n_elem {
                tx_del[(e, t)] =
                    (x_foc - probe.x_elem(e)).hypot(z_foc) / c * foc_defoc;
            }
            tx_del_cent[t] = focus.abs() / c * foc_defoc;
        }

        // Shift each column so its earliest in-aperture firing is at zero.
        let min_in_aperture = (0..n_elem)
            .filter(|&e| tx_ap_mask[(e, t)])
            .map(|e| tx_del[(e, t)])
            .fold(f64::INFINITY, f64::min);
        if min_in_aperture.is_finite() {
            for e in 0..n_elem {
                tx_del[(e, t)] -= min_in_aperture;
            }
            tx_del_cent[t] -= min_in_aperture;
        }
    }

    // Align all aperture centers on the latest one, so every transmit of the
    // sequence fires its center element at the same instant.
    let max_cent = tx_del_cent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for t in 0..n_tx {
        let delta = max_cent - tx_del_cent[t];
        for e in 0..n_elem {
            tx_del[(e, t)] = if tx_ap_mask[(e, t)] {
                tx_del[(e, t)] + delta
            } else {
                0.0
            };
        }
        tx_del_cent[t] = max_cent;
    }

    let n_sub_tx = match norm.kind() {
        ScanKind::Lin => 1,
        ScanKind::Sta | ScanKind::Pwi => {
            let logical = match adapter {
                AdapterType::Packed => n_elem,
                AdapterType::Interleaved => n_elem.min(OEM_TX_CHANNELS),
            };
            let physical = match adapter {
                AdapterType::Packed => OEM_RX_CHANNELS,
                AdapterType::Interleaved => OEM_RX_CHANNELS * n_oem,
            };
            logical.div_ceil(physical).clamp(1, MAX_SUB_TRANSMITS)
        }
    };

    let rx_origin = match norm.kind() {
        ScanKind::Lin => {
            let size = adapter.rx_aperture_size(n_oem);
            if size > n_elem {
                return Err(SequenceError::RxApertureTooWide { size, n_elem });
            }
            Some(
                norm.tx_cent_elem()
                    .iter()
                    .map(|&cent| {
                        let origin = (cent - (size as f64 - 1.0) / 2.0).round();
                        origin.clamp(0.0, (n_elem - size) as f64) as usize
                    })
                    .collect(),
            )
        }
        ScanKind::Sta | ScanKind::Pwi => None,
    };

    Ok(Plan {
        tx_ap_mask,
        tx_del,
        tx_del_cent,
        n_sub_tx,
        rx_origin,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use sonara_core::sequence::{
        ApertureCenter, PerTx, RxWindow, TxRxSequence,
    };

    use crate::normalize::normalize;

    use super::*;

    fn normalized(seq: &TxRxSequence, probe: &Probe) -> NormalizedSequence {
        normalize(seq, probe).unwrap()
    }

    fn sta_request(
        centers_mm: Vec<f64>,
        aperture: usize,
        focus: f64,
    ) -> TxRxSequence {
        TxRxSequence {
            kind: ScanKind::Sta,
            aperture_center: ApertureCenter::Position(PerTx::Each(
                centers_mm.into_iter().map(|x| x * 1e-3).collect(),
            )),
            aperture_size: PerTx::Uniform(aperture),
            focus: PerTx::Uniform(focus),
            rx_window: RxWindow::Samples { first: 1, last: 1024 },
            ..Default::default()
        }
    }

    #[test]
    fn straight_plane_wave_has_zero_delays() {
        let probe = Probe::by_name("L14-5/38").unwrap();
        let seq = TxRxSequence {
            aperture_size: PerTx::Uniform(128),
            angle: PerTx::Each(vec![0.0]),
            rx_window: RxWindow::Samples { first: 1, last: 1024 },
            ..Default::default()
        };
        let plan = plan(&normalized(&seq, &probe), &probe, AdapterType::Packed, 1).unwrap();
        assert_eq!(1, plan.tx_ap_mask().ncols());
        assert_eq!(4, plan.n_sub_tx());
        assert!(plan.tx_del().iter().all(|&d| d.abs() < 1e-15));
        assert!((0..128).all(|e| plan.tx_ap_mask()[(e, 0)]));
    }

    #[test]
    fn tilted_plane_wave_is_causal_and_linear_in_x() {
        let probe = Probe::by_name("L14-5/38").unwrap();
        let seq = TxRxSequence {
            aperture_size: PerTx::Uniform(128),
            angle: PerTx::Each(vec![10f64.to_radians()]),
            rx_window: RxWindow::Samples { first: 1, last: 1024 },
            ..Default::default()
        };
        let norm = normalized(&seq, &probe);
        let plan = plan(&norm, &probe, AdapterType::Packed, 1).unwrap();
        let min = (0..128).map(|e| plan.tx_del()[(e, 0)]).fold(f64::INFINITY, f64::min);
        approx::assert_abs_diff_eq!(0.0, min, epsilon = 1e-15);
        let slope = probe.pitch() * 10f64.to_radians().sin() / norm.speed_of_sound();
        for e in 1..128 {
            approx::assert_abs_diff_eq!(
                plan.tx_del()[(e, 0)] - plan.tx_del()[(e - 1, 0)],
                slope,
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn focused_transmit_is_symmetric_around_a_centered_aperture() {
        let probe = Probe::new("sym", 128, 0.3e-3);
        let seq = sta_request(vec![0.0], 127, 20e-3);
        let plan = plan(&normalized(&seq, &probe), &probe, AdapterType::Packed, 1).unwrap();
        // Aperture centered between elements 63 and 64: mirror pairs are
        // (63 - i, 64 + i).
        for i in 0..62 {
            assert!(plan.tx_ap_mask()[(63 - i, 0)] && plan.tx_ap_mask()[(64 + i, 0)]);
            approx::assert_abs_diff_eq!(
                plan.tx_del()[(63 - i, 0)],
                plan.tx_del()[(64 + i, 0)],
                epsilon = 1e-15
            );
        }
        // Edges fire first, the center last.
        assert!(plan.tx_del()[(63, 0)] > plan.tx_del()[(1, 0)]);
    }

    #[test]
    fn defocusing_negates_the_focused_profile() {
        let probe = Probe::new("sym", 128, 0.3e-3);
        let focused = plan(
            &normalized(&sta_request(vec![0.0], 127, 20e-3), &probe),
            &probe,
            AdapterType::Packed,
            1,
        )
        .unwrap();
        let diverging = plan(
            &normalized(&sta_request(vec![0.0], 127, -20e-3), &probe),
            &probe,
            AdapterType::Packed,
            1,
        )
        .unwrap();
        // Profiles are negated up to a common per-column offset.
        let offset = focused.tx_del()[(63, 0)] + diverging.tx_del()[(63, 0)];
        for e in 1..127 {
            approx::assert_abs_diff_eq!(
                focused.tx_del()[(e, 0)] + diverging.tx_del()[(e, 0)],
                offset,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn virtual_source_walk_is_causal_with_aligned_centers() {
        let probe = Probe::new("sta192", 192, 0.25e-3);
        let centers: Vec<f64> = (-5..=5).map(|i| (i * 3) as f64).collect();
        let seq = sta_request(centers, 32, -6e-3);
        let norm = normalized(&seq, &probe);
        let plan = plan(&norm, &probe, AdapterType::Packed, 2).unwrap();
        assert_eq!(11, norm.n_tx());
        for t in 0..11 {
            let in_aperture: Vec<f64> = (0..probe.n_elem())
                .filter(|&e| plan.tx_ap_mask()[(e, t)])
                .map(|e| plan.tx_del()[(e, t)])
                .collect();
            assert_eq!(32, in_aperture.len());
            // Every column starts firing at zero, and the diverging wave
            // reaches the aperture edges last.
            let min = in_aperture.iter().copied().fold(f64::INFINITY, f64::min);
            approx::assert_abs_diff_eq!(0.0, min, epsilon = 1e-15);
            assert!(in_aperture[0] > in_aperture[15]);
            assert!(*in_aperture.last().unwrap() > in_aperture[16]);
            // Center delays are aligned across the walk.
            approx::assert_abs_diff_eq!(
                plan.tx_del_cent()[t],
                plan.tx_del_cent()[0],
                epsilon = 1e-15
            );
        }
        // Rows beyond the probe stay dark.
        assert!((probe.n_elem()..256).all(|r| !plan.tx_ap_mask()[(r, 0)]));
    }

    #[rstest]
    #[case(4, AdapterType::Packed, 1, 128)]
    #[case(4, AdapterType::Packed, 2, 192)]
    #[case(2, AdapterType::Packed, 2, 64)]
    #[case(2, AdapterType::Interleaved, 2, 192)]
    #[case(4, AdapterType::Interleaved, 1, 128)]
    fn sub_transmit_count_covers_the_receive_aperture(
        #[case] expected: usize,
        #[case] adapter: AdapterType,
        #[case] n_oem: usize,
        #[case] n_elem: usize,
    ) {
        let probe = Probe::new("p", n_elem, 0.25e-3);
        let seq = TxRxSequence {
            aperture_size: PerTx::Uniform(n_elem),
            angle: PerTx::Each(vec![0.0]),
            rx_window: RxWindow::Samples { first: 1, last: 1024 },
            ..Default::default()
        };
        let plan = plan(&normalized(&seq, &probe), &probe, adapter, n_oem).unwrap();
        assert_eq!(expected, plan.n_sub_tx());
    }

    #[test]
    fn scan_line_rx_origin_tracks_and_clamps() {
        let probe = Probe::by_name("SL1543").unwrap();
        let centers: Vec<f64> = (0..192).map(|i| i as f64).collect();
        let seq = TxRxSequence {
            kind: ScanKind::Lin,
            aperture_center: ApertureCenter::Element(PerTx::Each(centers)),
            aperture_size: PerTx::Uniform(32),
            focus: PerTx::Uniform(20e-3),
            rx_window: RxWindow::Samples { first: 1, last: 1024 },
            ..Default::default()
        };
        let plan = plan(&normalized(&seq, &probe), &probe, AdapterType::Packed, 2).unwrap();
        assert_eq!(1, plan.n_sub_tx());
        let origin = plan.rx_origin().as_ref().unwrap();
        for t in 0..192usize {
            let expected = (t as i64 - 15).clamp(0, 160) as usize;
            assert_eq!(expected, origin[t], "transmit {t}");
        }
    }
}
