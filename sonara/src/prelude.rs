//! Commonly used items.

pub use sonara_core::{
    adapter::AdapterType,
    probe::Probe,
    sequence::{
        ApertureCenter, PerTx, Repetitions, RxWindow, ScanKind, TxRxSequence,
    },
};
pub use sonara_driver::{error::SequenceError, oem::Oem};

pub use crate::error::SessionError;
pub use crate::rf::RfFrame;
pub use crate::session::{Session, SessionOptions};
