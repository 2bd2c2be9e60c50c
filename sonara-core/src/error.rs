use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Unknown probe: {0}")]
    UnknownProbe(String),
    #[error("Probe has {n_elem} elements but {n_oem} modules address only {capacity}")]
    TooManyElements {
        n_elem: usize,
        n_oem: usize,
        capacity: usize,
    },
    #[error("Number of modules must be at least 1")]
    NoModules,
    #[error("TX channel map entry {value} is out of range [0, {limit})")]
    TxMapOutOfRange { value: usize, limit: usize },
    #[error("RX channel map entry {value} is out of range [0, {limit})")]
    RxMapOutOfRange { value: usize, limit: usize },
    #[error("Channel map for module {oem} has {actual} entries, expected {expected}")]
    MapLengthMismatch {
        oem: usize,
        expected: usize,
        actual: usize,
    },
}
