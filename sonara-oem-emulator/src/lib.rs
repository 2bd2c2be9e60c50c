//! An in-memory OEM module.
//!
//! Records every register write so tests can assert on the programmed state,
//! and synthesizes deterministic receive buffers: each asserted addressable
//! channel reports its own address as the sample value on the physical lane
//! it is routed to (`address mod 32`).

use std::collections::BTreeMap;

use getset::{CopyGetters, Getters};

use sonara_core::defined::{MAX_FIRINGS, OEM_RX_CHANNELS, OEM_TX_CHANNELS};
use sonara_driver::error::OemError;
use sonara_driver::mask::Mask;
use sonara_driver::oem::Oem;

/// TX parameters recorded for one firing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TxFiring {
    pub aperture: String,
    pub delays: Vec<f64>,
    pub frequency_hz: f64,
    pub half_periods: u32,
    pub invert: bool,
    pub active_channel_group: String,
}

/// RX parameters recorded for one firing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RxFiring {
    pub aperture: String,
    pub time_s: f64,
    pub delay_s: f64,
    pub tgc_samples: Vec<f64>,
}

/// One trigger-table entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerEntry {
    pub period_us: u32,
    pub sync_in: bool,
    pub sync_out: bool,
}

/// One scheduled receive slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledReceive {
    pub offset: usize,
    pub n_samples: usize,
    pub start_sample: u32,
    pub decimation: u32,
}

/// Analog front-end bring-up state.
#[derive(Clone, Debug, Default, PartialEq, CopyGetters)]
pub struct FrontEnd {
    #[getset(get_copy = "pub")]
    pga_gain_db: u8,
    #[getset(get_copy = "pub")]
    lpf_cutoff_hz: u32,
    #[getset(get_copy = "pub")]
    active_termination: Option<u16>,
    #[getset(get_copy = "pub")]
    lna_gain_db: u8,
    #[getset(get_copy = "pub")]
    dtgc: Option<u8>,
    #[getset(get_copy = "pub")]
    tgc_enabled: bool,
    #[getset(get_copy = "pub")]
    hv_enabled: bool,
    #[getset(get_copy = "pub")]
    hv_voltage: Option<u8>,
}

/// An emulated front-end module.
#[derive(Debug, Getters, CopyGetters)]
pub struct OemEmulator {
    #[getset(get_copy = "pub")]
    idx: usize,
    #[getset(get = "pub")]
    front_end: FrontEnd,
    #[getset(get = "pub")]
    tx_channel_map: Vec<u16>,
    #[getset(get = "pub")]
    rx_channel_map: Vec<u16>,
    tx_firings: BTreeMap<usize, TxFiring>,
    rx_firings: BTreeMap<usize, RxFiring>,
    #[getset(get_copy = "pub")]
    n_firings: usize,
    #[getset(get_copy = "pub")]
    transmit_enabled: bool,
    #[getset(get_copy = "pub")]
    receive_enabled: bool,
    #[getset(get = "pub")]
    triggers: Vec<Option<TriggerEntry>>,
    #[getset(get = "pub")]
    scheduled_receives: Vec<ScheduledReceive>,
    #[getset(get_copy = "pub")]
    running: bool,
    #[getset(get_copy = "pub")]
    sync_count: usize,
    hv_failures: usize,
}

impl OemEmulator {
    #[must_use]
    pub fn new(idx: usize) -> Self {
        Self {
            idx,
            front_end: FrontEnd::default(),
            tx_channel_map: Vec::new(),
            rx_channel_map: Vec::new(),
            tx_firings: BTreeMap::new(),
            rx_firings: BTreeMap::new(),
            n_firings: 0,
            transmit_enabled: false,
            receive_enabled: false,
            triggers: Vec::new(),
            scheduled_receives: Vec::new(),
            running: false,
            sync_count: 0,
            hv_failures: 0,
        }
    }

    /// Makes the next `n` high-voltage commands fail.
    pub fn inject_hv_failures(&mut self, n: usize) {
        self.hv_failures = n;
    }

    /// Recorded TX state of `firing`.
    #[must_use]
    pub fn tx_firing(&self, firing: usize) -> Option<&TxFiring> {
        self.tx_firings.get(&firing)
    }

    /// Recorded RX state of `firing`.
    #[must_use]
    pub fn rx_firing(&self, firing: usize) -> Option<&RxFiring> {
        self.rx_firings.get(&firing)
    }

    fn check_firing(&self, firing: usize) -> Result<(), OemError> {
        if firing >= MAX_FIRINGS {
            return Err(OemError::Command(format!(
                "firing index {firing} exceeds instruction memory"
            )));
        }
        Ok(())
    }

    fn tx_mut(&mut self, firing: usize) -> Result<&mut TxFiring, OemError> {
        self.check_firing(firing)?;
        Ok(self.tx_firings.entry(firing).or_default())
    }

    fn rx_mut(&mut self, firing: usize) -> Result<&mut RxFiring, OemError> {
        self.check_firing(firing)?;
        Ok(self.rx_firings.entry(firing).or_default())
    }

    fn take_hv_failure(&mut self) -> Result<(), OemError> {
        if self.hv_failures > 0 {
            self.hv_failures -= 1;
            return Err(OemError::Command("HV supply did not settle".to_string()));
        }
        Ok(())
    }
}

impl Oem for OemEmulator {
    fn set_tx_channel_mapping(&mut self, map: &[u16]) -> Result<(), OemError> {
        self.tx_channel_map = map.to_vec();
        Ok(())
    }

    fn set_rx_channel_mapping(&mut self, map: &[u16]) -> Result<(), OemError> {
        self.rx_channel_map = map.to_vec();
        Ok(())
    }

    fn set_pga_gain(&mut self, gain_db: u8) -> Result<(), OemError> {
        self.front_end.pga_gain_db = gain_db;
        Ok(())
    }

    fn set_lpf_cutoff(&mut self, cutoff_hz: u32) -> Result<(), OemError> {
        self.front_end.lpf_cutoff_hz = cutoff_hz;
        Ok(())
    }

    fn set_active_termination(
        &mut self,
        enable: bool,
        impedance_ohm: u16,
    ) -> Result<(), OemError> {
        self.front_end.active_termination = enable.then_some(impedance_ohm);
        Ok(())
    }

    fn set_lna_gain(&mut self, gain_db: u8) -> Result<(), OemError> {
        self.front_end.lna_gain_db = gain_db;
        Ok(())
    }

    fn set_dtgc(&mut self, enable: bool, attenuation_db: u8) -> Result<(), OemError> {
        self.front_end.dtgc = enable.then_some(attenuation_db);
        Ok(())
    }

    fn enable_tgc(&mut self) -> Result<(), OemError> {
        self.front_end.tgc_enabled = true;
        Ok(())
    }

    fn enable_hv(&mut self) -> Result<(), OemError> {
        self.take_hv_failure()?;
        self.front_end.hv_enabled = true;
        Ok(())
    }

    fn set_hv_voltage(&mut self, voltage: u8) -> Result<(), OemError> {
        self.take_hv_failure()?;
        self.front_end.hv_voltage = Some(voltage);
        Ok(())
    }

    fn set_tx_aperture(&mut self, mask: &str, firing: usize) -> Result<(), OemError> {
        Mask::from_hex_string(mask, OEM_TX_CHANNELS)
            .map_err(|e| OemError::Command(e.to_string()))?;
        self.tx_mut(firing)?.aperture = mask.to_string();
        Ok(())
    }

    fn set_tx_delays(&mut self, delays: &[f64], firing: usize) -> Result<(), OemError> {
        if delays.len() != OEM_TX_CHANNELS {
            return Err(OemError::Command(format!(
                "expected {OEM_TX_CHANNELS} delays, got {}",
                delays.len()
            )));
        }
        self.tx_mut(firing)?.delays = delays.to_vec();
        Ok(())
    }

    fn set_tx_frequency(&mut self, frequency_hz: f64, firing: usize) -> Result<(), OemError> {
        self.tx_mut(firing)?.frequency_hz = frequency_hz;
        Ok(())
    }

    fn set_tx_half_periods(&mut self, half_periods: u32, firing: usize) -> Result<(), OemError> {
        self.tx_mut(firing)?.half_periods = half_periods;
        Ok(())
    }

    fn set_tx_invert(&mut self, invert: bool, firing: usize) -> Result<(), OemError> {
        self.tx_mut(firing)?.invert = invert;
        Ok(())
    }

    fn set_active_channel_group(&mut self, mask: &str, firing: usize) -> Result<(), OemError> {
        self.tx_mut(firing)?.active_channel_group = mask.to_string();
        Ok(())
    }

    fn set_rx_aperture(&mut self, mask: &str, firing: usize) -> Result<(), OemError> {
        let decoded = Mask::from_hex_string(mask, OEM_TX_CHANNELS)
            .map_err(|e| OemError::Command(e.to_string()))?;
        // A physical lane serves the addressable channels congruent to it
        // modulo 32; at most one of them may be asserted per firing.
        let mut lanes = [false; OEM_RX_CHANNELS];
        for c in decoded.ones() {
            let lane = c % OEM_RX_CHANNELS;
            if lanes[lane] {
                return Err(OemError::Command(format!(
                    "RX aperture asserts physical lane {lane} twice"
                )));
            }
            lanes[lane] = true;
        }
        self.rx_mut(firing)?.aperture = mask.to_string();
        Ok(())
    }

    fn set_rx_time(&mut self, time_s: f64, firing: usize) -> Result<(), OemError> {
        self.rx_mut(firing)?.time_s = time_s;
        Ok(())
    }

    fn set_rx_delay(&mut self, delay_s: f64, firing: usize) -> Result<(), OemError> {
        self.rx_mut(firing)?.delay_s = delay_s;
        Ok(())
    }

    fn set_tgc_samples(&mut self, samples: &[f64], firing: usize) -> Result<(), OemError> {
        self.rx_mut(firing)?.tgc_samples = samples.to_vec();
        Ok(())
    }

    fn set_number_of_firings(&mut self, n_firings: usize) -> Result<(), OemError> {
        if n_firings > MAX_FIRINGS {
            return Err(OemError::Command(format!(
                "{n_firings} firings exceed instruction memory"
            )));
        }
        self.n_firings = n_firings;
        Ok(())
    }

    fn enable_transmit(&mut self) -> Result<(), OemError> {
        self.transmit_enabled = true;
        Ok(())
    }

    fn enable_receive(&mut self) -> Result<(), OemError> {
        self.receive_enabled = true;
        Ok(())
    }

    fn set_n_triggers(&mut self, n_triggers: usize) -> Result<(), OemError> {
        self.triggers = vec![None; n_triggers];
        Ok(())
    }

    fn set_trigger(
        &mut self,
        period_us: u32,
        sync_in: bool,
        sync_out: bool,
        idx: usize,
    ) -> Result<(), OemError> {
        let slot = self
            .triggers
            .get_mut(idx)
            .ok_or_else(|| OemError::Command(format!("trigger index {idx} out of table")))?;
        *slot = Some(TriggerEntry {
            period_us,
            sync_in,
            sync_out,
        });
        Ok(())
    }

    fn clear_scheduled_receive(&mut self) -> Result<(), OemError> {
        self.scheduled_receives.clear();
        Ok(())
    }

    fn schedule_receive(
        &mut self,
        offset: usize,
        n_samples: usize,
        start_sample: u32,
        decimation: u32,
    ) -> Result<(), OemError> {
        self.scheduled_receives.push(ScheduledReceive {
            offset,
            n_samples,
            start_sample,
            decimation,
        });
        Ok(())
    }

    fn trigger_start(&mut self) -> Result<(), OemError> {
        self.running = true;
        Ok(())
    }

    fn trigger_sync(&mut self) -> Result<(), OemError> {
        if !self.running {
            return Err(OemError::Command(
                "trigger engine is not running".to_string(),
            ));
        }
        self.sync_count += 1;
        Ok(())
    }

    fn trigger_stop(&mut self) -> Result<(), OemError> {
        self.running = false;
        Ok(())
    }

    fn transfer_rx_buffer_to_host(&mut self) -> Result<Vec<i16>, OemError> {
        if self.n_firings == 0 {
            return Err(OemError::Transfer("no sequence programmed".to_string()));
        }
        let total: usize = self
            .scheduled_receives
            .iter()
            .map(|r| (r.offset + r.n_samples) * OEM_RX_CHANNELS)
            .max()
            .unwrap_or(0);
        let mut buf = vec![0i16; total];
        for (i, rx) in self.scheduled_receives.iter().enumerate() {
            let firing = i % self.n_firings;
            let Some(state) = self.rx_firings.get(&firing) else {
                continue;
            };
            let mask = Mask::from_hex_string(&state.aperture, OEM_TX_CHANNELS)
                .map_err(|e| OemError::Transfer(e.to_string()))?;
            for c in mask.ones() {
                let lane = c % OEM_RX_CHANNELS;
                for s in 0..rx.n_samples {
                    buf[(rx.offset + s) * OEM_RX_CHANNELS + lane] = c as i16;
                }
            }
        }
        Ok(buf)
    }
}
