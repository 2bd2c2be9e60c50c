use std::time::{Duration, Instant};

use getset::{CopyGetters, Getters};

use sonara_core::adapter::{AdapterType, ChannelMapping};
use sonara_core::defined::{
    HV_VOLTAGE_MAX, OEM_TX_CHANNELS, TRIGGER_PAUSE_MULTIPLIER,
};
use sonara_core::error::ConfigError;
use sonara_core::probe::Probe;
use sonara_core::sequence::TxRxSequence;
use sonara_driver::normalize::{normalize, NormalizedSequence};
use sonara_driver::oem::Oem;
use sonara_driver::plan::{plan, Plan};
use sonara_driver::program::{program, FiringSchedule};

use crate::error::SessionError;
use crate::rf::{demultiplex, RfFrame};

/// Options of [`Session::open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// HV supply setting, in 0.5 Vpp steps.
    pub voltage: u8,
    /// Log per-phase wall-clock times of every run.
    pub log_time: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            voltage: 10,
            log_time: false,
        }
    }
}

struct Uploaded {
    norm: NormalizedSequence,
    plan: Plan,
    schedule: FiringSchedule,
}

/// A blocking acquisition session over a stack of OEM modules.
///
/// All hardware access goes through this struct: [`Session::open`] brings
/// the analog front end up, [`Session::upload`] lowers a request onto the
/// modules, [`Session::run`] produces demultiplexed frames.
#[derive(Getters, CopyGetters)]
pub struct Session<O: Oem> {
    oems: Vec<O>,
    #[getset(get = "pub")]
    probe: Probe,
    #[getset(get_copy = "pub")]
    adapter: AdapterType,
    #[getset(get = "pub")]
    mapping: ChannelMapping,
    options: SessionOptions,
    uploaded: Option<Uploaded>,
    started: bool,
}

impl<O: Oem> Session<O> {
    /// Opens a session: programs the channel maps, configures the analog
    /// front end, and raises the high-voltage supply.
    ///
    /// HV commands are retried once; all other module failures propagate.
    #[tracing::instrument(skip(oems, probe), fields(probe = %probe.name()))]
    pub fn open(
        oems: Vec<O>,
        probe: Probe,
        adapter: AdapterType,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        if oems.is_empty() {
            return Err(SessionError::NoModules);
        }
        if options.voltage > HV_VOLTAGE_MAX {
            return Err(SessionError::VoltageOutOfRange(options.voltage));
        }
        let n_oem = oems.len();
        if probe.n_elem() > OEM_TX_CHANNELS * n_oem {
            return Err(ConfigError::TooManyElements {
                n_elem: probe.n_elem(),
                n_oem,
                capacity: OEM_TX_CHANNELS * n_oem,
            }
            .into());
        }
        let mapping = ChannelMapping::identity(n_oem)?;

        let mut session = Self {
            oems,
            probe,
            adapter,
            mapping,
            options,
            uploaded: None,
            started: false,
        };
        for k in 0..n_oem {
            let oem = &mut session.oems[k];
            oem.set_tx_channel_mapping(session.mapping.tx_map(k))?;
            oem.set_rx_channel_mapping(session.mapping.rx_map(k))?;
            oem.set_pga_gain(30)?;
            oem.set_lpf_cutoff(15_000_000)?;
            oem.set_active_termination(true, 200)?;
            oem.set_lna_gain(24)?;
            oem.set_dtgc(false, 0)?;
            oem.enable_tgc()?;
        }
        retry_hv_once(|| session.oems[0].enable_hv())?;
        let voltage = session.options.voltage;
        retry_hv_once(|| session.oems[0].set_hv_voltage(voltage))?;
        Ok(session)
    }

    /// Validates, plans, and programs a request onto the modules.
    #[tracing::instrument(skip_all)]
    pub fn upload(&mut self, seq: &TxRxSequence) -> Result<(), SessionError> {
        self.stop_if_started()?;
        let norm = normalize(seq, &self.probe)?;
        let plan = plan(&norm, &self.probe, self.adapter, self.oems.len())?;
        let schedule = program(&mut self.oems, &norm, &plan, &self.probe, self.adapter)?;
        self.uploaded = Some(Uploaded {
            norm,
            plan,
            schedule,
        });
        Ok(())
    }

    /// The sequence currently loaded on the modules.
    #[must_use]
    pub fn sequence(&self) -> Option<&NormalizedSequence> {
        self.uploaded.as_ref().map(|u| &u.norm)
    }

    /// Starts the trigger engine and waits out the first scan.
    ///
    /// [`Session::run`] starts the engine on demand; calling this explicitly
    /// only moves the initial pause forward.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let uploaded = self.uploaded.as_ref().ok_or(SessionError::NotUploaded)?;
        let pause = trigger_pause(&uploaded.norm, &uploaded.schedule);
        if !self.started {
            self.oems[0].trigger_start()?;
            std::thread::sleep(pause);
            self.started = true;
        }
        Ok(())
    }

    /// Runs one acquisition and returns the demultiplexed frame.
    pub fn run(&mut self) -> Result<RfFrame, SessionError> {
        self.start()?;
        let uploaded = self.uploaded.as_ref().ok_or(SessionError::NotUploaded)?;
        let pause = trigger_pause(&uploaded.norm, &uploaded.schedule);

        let t0 = Instant::now();
        for oem in &mut self.oems {
            oem.enable_receive()?;
        }
        self.oems[0].trigger_sync()?;
        std::thread::sleep(pause);
        let t_acq = Instant::now();

        let buffers = self
            .oems
            .iter_mut()
            .map(|oem| oem.transfer_rx_buffer_to_host())
            .collect::<Result<Vec<_>, _>>()?;
        let t_xfer = Instant::now();

        let uploaded = self.uploaded.as_ref().expect("sequence still loaded");
        let data = demultiplex(
            &buffers,
            &uploaded.norm,
            &uploaded.plan,
            self.adapter,
            self.probe.n_elem(),
            uploaded.schedule.n_rep(),
        );
        if self.options.log_time {
            tracing::debug!(
                acquisition = ?t_acq.duration_since(t0),
                transfer = ?t_xfer.duration_since(t_acq),
                demultiplex = ?t_xfer.elapsed(),
                "Frame timing"
            );
        }
        Ok(RfFrame::new(data, &uploaded.norm))
    }

    /// Runs acquisitions until `should_continue` returns false, handing each
    /// frame to `on_frame`.
    pub fn run_loop(
        &mut self,
        mut should_continue: impl FnMut() -> bool,
        mut on_frame: impl FnMut(&RfFrame),
    ) -> Result<(), SessionError> {
        while should_continue() {
            let frame = self.run()?;
            on_frame(&frame);
        }
        Ok(())
    }

    /// Stops the trigger engine.
    pub fn close(&mut self) -> Result<(), SessionError> {
        self.stop_if_started()
    }

    fn stop_if_started(&mut self) -> Result<(), SessionError> {
        if self.started {
            self.oems[0].trigger_stop()?;
            self.started = false;
        }
        Ok(())
    }

    #[doc(hidden)]
    pub fn oems(&self) -> &[O] {
        &self.oems
    }
}

/// Worst-case scan time with headroom; the trigger engine is not polled.
fn trigger_pause(norm: &NormalizedSequence, schedule: &FiringSchedule) -> Duration {
    Duration::from_secs_f64(
        TRIGGER_PAUSE_MULTIPLIER * norm.tx_pri() * schedule.n_trig() as f64,
    )
}

fn retry_hv_once(
    mut f: impl FnMut() -> Result<(), sonara_driver::error::OemError>,
) -> Result<(), SessionError> {
    if let Err(e) = f() {
        tracing::warn!("HV command failed, retrying once: {e}");
        f()?;
    }
    Ok(())
}
