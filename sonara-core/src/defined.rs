/// Number of transmit channels of a single OEM module.
pub const OEM_TX_CHANNELS: usize = 128;
/// Number of physical receive channels of a single OEM module.
pub const OEM_RX_CHANNELS: usize = 32;
/// Number of 8-channel groups addressable on one OEM.
pub const OEM_CHANNEL_GROUPS: usize = 16;

/// Base sampling clock of the receive path.
pub const SAMPLING_CLOCK_HZ: f64 = 65e6;

/// Instruction-memory capacity: maximum number of firings per sequence.
pub const MAX_FIRINGS: usize = 1024;
/// Trigger-table capacity.
pub const MAX_TRIGGERS: usize = 16384;
/// DDR capacity of a single OEM module in bytes.
pub const OEM_DDR_BYTES: u64 = 1 << 32;
/// `nSamp * fsDivider` may not exceed this value.
pub const MAX_SAMPLES_CLOCK_PRODUCT: usize = 1 << 13;
/// Record lengths must be a multiple of this (DMA burst size).
pub const SAMPLE_ALIGNMENT: usize = 64;
/// Maximum number of sub-transmits covering one logical receive aperture.
pub const MAX_SUB_TRANSMITS: usize = 4;

/// Fixed front-end pipeline latency, in samples at the base clock.
pub const RX_PIPELINE_DELAY_SAMPLES: u32 = 240;
/// Receive window length programmed per firing.
pub const RX_TIME_S: f64 = 160e-6;
/// Receive start delay programmed per firing.
pub const RX_DELAY_S: f64 = 5e-6;

/// Open-loop trigger pause is this multiple of the worst-case scan time.
pub const TRIGGER_PAUSE_MULTIPLIER: f64 = 1.5;

/// TGC gain range accepted by the DAC, in dB.
pub const TGC_MIN_DB: f64 = 14.0;
/// Upper end of the TGC DAC gain range, in dB.
pub const TGC_MAX_DB: f64 = 54.0;

/// Highest programmable HV supply setting, in 0.5 Vpp steps.
pub const HV_VOLTAGE_MAX: u8 = 90;
