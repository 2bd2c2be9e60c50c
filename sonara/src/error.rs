use thiserror::Error;

use sonara_core::defined::HV_VOLTAGE_MAX;
use sonara_driver::error::{OemError, ProgramError, SequenceError};

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Oem(#[from] OemError),
    #[error(transparent)]
    Config(#[from] sonara_core::error::ConfigError),
    #[error("HV voltage ({0}) is out of range [0, {max}]", max = HV_VOLTAGE_MAX)]
    VoltageOutOfRange(u8),
    #[error("No sequence has been uploaded")]
    NotUploaded,
    #[error("Session needs at least one module")]
    NoModules,
}

impl From<ProgramError> for SessionError {
    fn from(e: ProgramError) -> Self {
        match e {
            ProgramError::Sequence(e) => SessionError::Sequence(e),
            ProgramError::Oem(e) => SessionError::Oem(e),
            _ => unreachable!("ProgramError is non_exhaustive but only has Sequence/Oem variants"),
        }
    }
}
