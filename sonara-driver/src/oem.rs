use crate::error::OemError;

/// The command set of a single transmit/receive front-end module.
///
/// All commands are synchronous; a call returns once the module has accepted
/// the write. Aperture masks cross this boundary as big-endian hex strings,
/// everything else as plain scalars and slices. Commands addressed to the
/// whole device (high voltage, triggers) are issued on module 0 only.
///
/// Transferred receive buffers are flat `i16` sample blocks laid out with the
/// physical channel varying fastest, then the sample index, then the trigger
/// index.
pub trait Oem: Send {
    // Bring-up.
    fn set_tx_channel_mapping(&mut self, map: &[u16]) -> Result<(), OemError>;
    fn set_rx_channel_mapping(&mut self, map: &[u16]) -> Result<(), OemError>;
    fn set_pga_gain(&mut self, gain_db: u8) -> Result<(), OemError>;
    fn set_lpf_cutoff(&mut self, cutoff_hz: u32) -> Result<(), OemError>;
    fn set_active_termination(&mut self, enable: bool, impedance_ohm: u16)
        -> Result<(), OemError>;
    fn set_lna_gain(&mut self, gain_db: u8) -> Result<(), OemError>;
    fn set_dtgc(&mut self, enable: bool, attenuation_db: u8) -> Result<(), OemError>;
    fn enable_tgc(&mut self) -> Result<(), OemError>;
    fn enable_hv(&mut self) -> Result<(), OemError>;
    fn set_hv_voltage(&mut self, voltage: u8) -> Result<(), OemError>;

    // Per-firing TX/RX parameters.
    fn set_tx_aperture(&mut self, mask: &str, firing: usize) -> Result<(), OemError>;
    fn set_tx_delays(&mut self, delays: &[f64], firing: usize) -> Result<(), OemError>;
    fn set_tx_frequency(&mut self, frequency_hz: f64, firing: usize) -> Result<(), OemError>;
    fn set_tx_half_periods(&mut self, half_periods: u32, firing: usize) -> Result<(), OemError>;
    fn set_tx_invert(&mut self, invert: bool, firing: usize) -> Result<(), OemError>;
    fn set_active_channel_group(&mut self, mask: &str, firing: usize) -> Result<(), OemError>;
    fn set_rx_aperture(&mut self, mask: &str, firing: usize) -> Result<(), OemError>;
    fn set_rx_time(&mut self, time_s: f64, firing: usize) -> Result<(), OemError>;
    fn set_rx_delay(&mut self, delay_s: f64, firing: usize) -> Result<(), OemError>;
    fn set_tgc_samples(&mut self, samples: &[f64], firing: usize) -> Result<(), OemError>;

    // Sequencing.
    fn set_number_of_firings(&mut self, n_firings: usize) -> Result<(), OemError>;
    fn enable_transmit(&mut self) -> Result<(), OemError>;
    fn enable_receive(&mut self) -> Result<(), OemError>;
    fn set_n_triggers(&mut self, n_triggers: usize) -> Result<(), OemError>;
    fn set_trigger(
        &mut self,
        period_us: u32,
        sync_in: bool,
        sync_out: bool,
        idx: usize,
    ) -> Result<(), OemError>;
    fn clear_scheduled_receive(&mut self) -> Result<(), OemError>;
    fn schedule_receive(
        &mut self,
        offset: usize,
        n_samples: usize,
        start_sample: u32,
        decimation: u32,
    ) -> Result<(), OemError>;

    // Trigger engine and readout.
    fn trigger_start(&mut self) -> Result<(), OemError>;
    fn trigger_sync(&mut self) -> Result<(), OemError>;
    fn trigger_stop(&mut self) -> Result<(), OemError>;
    fn transfer_rx_buffer_to_host(&mut self) -> Result<Vec<i16>, OemError>;
}
