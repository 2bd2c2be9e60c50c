use thiserror::Error;

use sonara_core::defined::{
    MAX_FIRINGS, MAX_SAMPLES_CLOCK_PRODUCT, MAX_TRIGGERS, OEM_DDR_BYTES, SAMPLE_ALIGNMENT,
};
use sonara_core::sequence::PerTxLengthError;

/// A malformed or hardware-infeasible acquisition request.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SequenceError {
    #[error(transparent)]
    PerTxLength(#[from] PerTxLengthError),

    #[error("Sequence defines no transmits")]
    NoTransmits,
    #[error("TX aperture size ({size}) is out of range [1, {n_elem}]")]
    ApertureSizeOutOfRange { size: usize, n_elem: usize },
    #[error("RX aperture ({size} channels) does not fit a {n_elem}-element probe")]
    RxApertureTooWide { size: usize, n_elem: usize },

    #[error("Depth range [{min}, {max}] m is invalid")]
    DepthRangeInvalid { min: f64, max: f64 },
    #[error("Sample range [{first}, {last}] is invalid; samples are 1-indexed")]
    SampleRangeInvalid { first: u32, last: u32 },
    #[error(
        "Number of samples ({n_samp}) must be a multiple of {alignment}",
        alignment = SAMPLE_ALIGNMENT
    )]
    SamplesNotAligned { n_samp: usize },
    #[error(
        "Number of samples ({n_samp}) exceeds {max} / fsDivider = {limit}",
        max = MAX_SAMPLES_CLOCK_PRODUCT
    )]
    SamplesOutOfRange { n_samp: usize, limit: usize },

    #[error("Sampling clock divider must be at least 1")]
    FsDividerInvalid,
    #[error("Speed of sound ({0} m/s) must be positive and finite")]
    SpeedOfSoundInvalid(f64),
    #[error("TX frequency ({0} Hz) must be positive and finite")]
    TxFrequencyInvalid(f64),
    #[error("Number of TX periods must be at least 1")]
    TxPeriodsInvalid,
    #[error("Pulse repetition interval ({0} s) must be positive and finite")]
    TxPriInvalid(f64),
    #[error("Number of repetitions must be at least 1")]
    RepetitionsInvalid,

    #[error("Sequence needs {n_fire} firings, instruction memory holds {max}", max = MAX_FIRINGS)]
    TooManyFirings { n_fire: usize },
    #[error("Sequence needs {n_trig} triggers, trigger table holds {max}", max = MAX_TRIGGERS)]
    TooManyTriggers { n_trig: usize },
    #[error(
        "Acquisition needs {required} bytes per module, DDR holds {capacity}",
        capacity = OEM_DDR_BYTES
    )]
    OutOfMemory { required: u64 },
}

/// A failure reported by an OEM module backend.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum OemError {
    #[error("{0}")]
    Command(String),
    #[error("Bulk transfer failed: {0}")]
    Transfer(String),
}

/// A failure while lowering a sequence onto the modules.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgramError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Oem(#[from] OemError),
}
