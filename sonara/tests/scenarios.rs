use sonara::prelude::*;
use sonara_oem_emulator::OemEmulator;

fn open_session(
    n_oem: usize,
    probe: Probe,
    adapter: AdapterType,
) -> Session<OemEmulator> {
    Session::open(
        (0..n_oem).map(OemEmulator::new).collect(),
        probe,
        adapter,
        SessionOptions {
            voltage: 10,
            log_time: false,
        },
    )
    .unwrap()
}

fn fast_pri(seq: TxRxSequence) -> TxRxSequence {
    TxRxSequence {
        tx_pri: 1e-6,
        ..seq
    }
}

#[test]
fn open_brings_the_front_end_up() {
    let session = open_session(2, Probe::by_name("SL1543").unwrap(), AdapterType::Packed);
    for oem in session.oems() {
        let fe = oem.front_end();
        assert_eq!(30, fe.pga_gain_db());
        assert_eq!(15_000_000, fe.lpf_cutoff_hz());
        assert_eq!(Some(200), fe.active_termination());
        assert_eq!(24, fe.lna_gain_db());
        assert_eq!(None, fe.dtgc());
        assert!(fe.tgc_enabled());
    }
    // HV is device-global, raised on module 0 only.
    assert!(session.oems()[0].front_end().hv_enabled());
    assert_eq!(Some(10), session.oems()[0].front_end().hv_voltage());
    assert_eq!(128, session.mapping().tx_map(1)[0] as usize);
}

#[test]
fn open_retries_hv_once() {
    let mut oems = vec![OemEmulator::new(0)];
    oems[0].inject_hv_failures(1);
    let session = Session::open(
        oems,
        Probe::by_name("L14-5/38").unwrap(),
        AdapterType::Packed,
        SessionOptions::default(),
    )
    .unwrap();
    assert!(session.oems()[0].front_end().hv_enabled());
}

#[test]
fn open_gives_up_after_the_retry() {
    let mut oems = vec![OemEmulator::new(0)];
    oems[0].inject_hv_failures(2);
    let result = Session::open(
        oems,
        Probe::by_name("L14-5/38").unwrap(),
        AdapterType::Packed,
        SessionOptions::default(),
    );
    assert!(matches!(result, Err(SessionError::Oem(_))));
}

#[test]
fn open_validates_voltage_and_probe_fit() {
    let result = Session::open(
        vec![OemEmulator::new(0)],
        Probe::by_name("L14-5/38").unwrap(),
        AdapterType::Packed,
        SessionOptions {
            voltage: 91,
            log_time: false,
        },
    );
    assert!(matches!(result, Err(SessionError::VoltageOutOfRange(91))));

    let result = Session::open(
        vec![OemEmulator::new(0)],
        Probe::by_name("SL1543").unwrap(),
        AdapterType::Packed,
        SessionOptions::default(),
    );
    assert!(matches!(result, Err(SessionError::Config(_))));
}

#[test]
fn run_without_an_upload_is_rejected() {
    let mut session = open_session(1, Probe::by_name("L14-5/38").unwrap(), AdapterType::Packed);
    assert!(matches!(session.run(), Err(SessionError::NotUploaded)));
}

/// Single straight plane wave on one module: four sub-transmits, flat
/// delays, and a trigger table whose last entry raises the sync output.
#[test]
fn plane_wave_single_module() {
    let mut session = open_session(1, Probe::by_name("L14-5/38").unwrap(), AdapterType::Packed);
    let seq = fast_pri(TxRxSequence {
        kind: ScanKind::Pwi,
        aperture_size: PerTx::Uniform(128),
        angle: PerTx::Each(vec![0.0]),
        rx_window: RxWindow::Samples { first: 1, last: 64 },
        repetitions: Repetitions::Count(5),
        ..Default::default()
    });
    session.upload(&seq).unwrap();

    let oem = &session.oems()[0];
    assert_eq!(4, oem.n_firings());
    assert!(oem.transmit_enabled() && oem.receive_enabled());
    for f in 0..4 {
        let tx = oem.tx_firing(f).unwrap();
        assert_eq!("f".repeat(32), tx.aperture);
        assert!(tx.delays.iter().all(|&d| d.abs() < 1e-15));
        assert_eq!(4, tx.half_periods);
        assert_eq!("ffff", tx.active_channel_group);
        assert!(!tx.invert);
    }

    // nTrig = 4 firings x 5 repetitions.
    assert_eq!(20, oem.triggers().len());
    for (i, trig) in oem.triggers().iter().enumerate() {
        let trig = trig.unwrap();
        assert_eq!(1, trig.period_us);
        assert!(!trig.sync_in);
        assert_eq!(i == 19, trig.sync_out);
    }
    assert_eq!(20, oem.scheduled_receives().len());
    for (i, rx) in oem.scheduled_receives().iter().enumerate() {
        assert_eq!(i * 64, rx.offset);
        assert_eq!(64, rx.n_samples);
        assert_eq!(241, rx.start_sample);
        assert_eq!(0, rx.decimation);
    }

    let frame = session.run().unwrap();
    assert_eq!(&[64, 128, 1, 5], frame.data().shape());
    // The emulator reports each addressable channel's own address, so the
    // demultiplexed channel axis must count the elements in order.
    for r in 0..5 {
        for g in 0..128usize {
            assert_eq!(g as i16, frame.data()[(0, g, 0, r)]);
        }
    }
    assert_eq!(1, session.oems()[0].sync_count());
    session.close().unwrap();
    assert!(!session.oems()[0].running());
}

/// Walking virtual source over two modules: the transmit aperture is split
/// across the stack but always 32 elements wide in total.
#[test]
fn virtual_source_walk_two_modules() {
    let probe = Probe::new("sta192", 192, 0.25e-3);
    let mut session = open_session(2, probe, AdapterType::Packed);
    let centers: Vec<f64> = (-5..=5).map(|i| (i * 3) as f64 * 1e-3).collect();
    let seq = fast_pri(TxRxSequence {
        kind: ScanKind::Sta,
        aperture_center: ApertureCenter::Position(PerTx::Each(centers)),
        aperture_size: PerTx::Uniform(32),
        focus: PerTx::Uniform(-6e-3),
        rx_window: RxWindow::Samples { first: 1, last: 64 },
        ..Default::default()
    });
    session.upload(&seq).unwrap();

    let n_sub = 4;
    assert_eq!(11 * n_sub, session.oems()[0].n_firings());
    for t in 0..11 {
        let total: usize = session
            .oems()
            .iter()
            .map(|oem| {
                let hex = &oem.tx_firing(t * n_sub).unwrap().aperture;
                hex.chars()
                    .map(|c| c.to_digit(16).unwrap().count_ones() as usize)
                    .sum::<usize>()
            })
            .sum();
        assert_eq!(32, total, "transmit {t}");
    }

    let frame = session.run().unwrap();
    // 32 * nSubTx * nOEM exceeds the element count, so the channel axis is
    // the whole probe.
    assert_eq!(&[64, 192, 11, 1], frame.data().shape());
}

/// Scan-line sequence over two modules: one sub-transmit, a receive
/// aperture tracking the line, and channels aligned to the aperture origin.
#[test]
fn scan_lines_two_modules() {
    let mut session = open_session(2, Probe::by_name("SL1543").unwrap(), AdapterType::Packed);
    let centers: Vec<f64> = (0..192).map(|i| i as f64).collect();
    let seq = fast_pri(TxRxSequence {
        kind: ScanKind::Lin,
        aperture_center: ApertureCenter::Element(PerTx::Each(centers)),
        aperture_size: PerTx::Uniform(32),
        focus: PerTx::Uniform(20e-3),
        rx_window: RxWindow::Samples { first: 1, last: 64 },
        ..Default::default()
    });
    session.upload(&seq).unwrap();
    assert_eq!(192, session.oems()[0].n_firings());

    let frame = session.run().unwrap();
    assert_eq!(&[64, 32, 192, 1], frame.data().shape());
    for t in 0..192usize {
        let origin = (t as i64 - 15).clamp(0, 160) as usize;
        for j in 0..32usize {
            let element = origin + j;
            assert_eq!(
                (element % 128) as i16,
                frame.data()[(0, j, t, 0)],
                "transmit {t} channel {j}"
            );
        }
    }
}

/// A TGC request below the DAC range clamps to the bottom of the curve.
#[test]
fn tgc_clamp_programs_a_zero_curve() {
    let mut session = open_session(1, Probe::by_name("L14-5/38").unwrap(), AdapterType::Packed);
    let seq = fast_pri(TxRxSequence {
        aperture_size: PerTx::Uniform(128),
        angle: PerTx::Each(vec![0.0]),
        rx_window: RxWindow::Samples { first: 1, last: 4096 },
        tgc_start: 5.0,
        tgc_slope: 0.0,
        ..Default::default()
    });
    session.upload(&seq).unwrap();
    let rx = session.oems()[0].rx_firing(0).unwrap();
    assert!(!rx.tgc_samples.is_empty());
    assert!(rx.tgc_samples.iter().all(|&v| v.abs() < 1e-12));
}

/// Budget violations surface before any register is touched.
#[test]
fn over_budget_sequences_are_rejected() {
    let mut session = open_session(1, Probe::by_name("L14-5/38").unwrap(), AdapterType::Packed);
    let seq = fast_pri(TxRxSequence {
        aperture_size: PerTx::Uniform(128),
        angle: PerTx::Each(vec![0.0; 1024]),
        rx_window: RxWindow::Samples { first: 1, last: 4096 },
        ..Default::default()
    });
    assert_eq!(
        Err(SessionError::Sequence(SequenceError::TooManyFirings {
            n_fire: 4096
        })),
        session.upload(&seq)
    );
    assert_eq!(0, session.oems()[0].n_firings());
}

#[test]
fn run_loop_counts_frames() {
    let mut session = open_session(1, Probe::by_name("L14-5/38").unwrap(), AdapterType::Packed);
    let seq = fast_pri(TxRxSequence {
        aperture_size: PerTx::Uniform(128),
        angle: PerTx::Each(vec![0.0]),
        rx_window: RxWindow::Samples { first: 1, last: 64 },
        ..Default::default()
    });
    session.upload(&seq).unwrap();

    let mut frames = 0;
    let mut budget = 3;
    session
        .run_loop(
            || {
                budget -= 1;
                budget >= 0
            },
            |frame| {
                assert_eq!(&[64, 128, 1, 1], frame.data().shape());
                frames += 1;
            },
        )
        .unwrap();
    assert_eq!(3, frames);
    assert_eq!(3, session.oems()[0].sync_count());
    session.close().unwrap();
}
