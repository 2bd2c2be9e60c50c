use thiserror::Error;

/// Scan strategy tag.
///
/// The three kinds differ only in how the transmit count, the receive
/// aperture origin, and the sub-transmit count are derived, and in how
/// acquired channels are aligned after demultiplexing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanKind {
    /// Classical linear scan: one focused beam per scan line, receive
    /// aperture tracking the transmit aperture.
    Lin,
    /// Synthetic transmit aperture: small transmit aperture walked over the
    /// array, full receive aperture.
    Sta,
    /// Plane-wave imaging: unfocused tilted wavefronts, full apertures.
    Pwi,
}

/// A per-transmit parameter given either as a scalar (applied to every
/// transmit) or as one value per transmit.
#[derive(Clone, Debug, PartialEq)]
pub enum PerTx<T> {
    Uniform(T),
    Each(Vec<T>),
}

/// Length mismatch between a per-transmit vector and the transmit count.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Per-transmit vector has {actual} entries, expected {expected}")]
pub struct PerTxLengthError {
    pub expected: usize,
    pub actual: usize,
}

impl<T: Clone> PerTx<T> {
    /// Number of entries, if given per transmit.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            PerTx::Uniform(_) => None,
            PerTx::Each(v) => Some(v.len()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, PerTx::Each(v) if v.is_empty())
    }

    /// Broadcasts to a vector of length `n_tx`.
    pub fn materialize(&self, n_tx: usize) -> Result<Vec<T>, PerTxLengthError> {
        match self {
            PerTx::Uniform(value) => Ok(vec![value.clone(); n_tx]),
            PerTx::Each(values) if values.len() == n_tx => Ok(values.clone()),
            PerTx::Each(values) => Err(PerTxLengthError {
                expected: n_tx,
                actual: values.len(),
            }),
        }
    }
}

impl<T> From<T> for PerTx<T> {
    fn from(value: T) -> Self {
        PerTx::Uniform(value)
    }
}

impl<T> From<Vec<T>> for PerTx<T> {
    fn from(values: Vec<T>) -> Self {
        PerTx::Each(values)
    }
}

/// Transmit aperture center, as a fractional element index or a lateral
/// position in meters.
#[derive(Clone, Debug, PartialEq)]
pub enum ApertureCenter {
    Element(PerTx<f64>),
    Position(PerTx<f64>),
}

/// Receive window, as a depth range in meters or an inclusive 1-indexed
/// sample range at the divided sampling rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RxWindow {
    DepthRange { min: f64, max: f64 },
    Samples { first: u32, last: u32 },
}

/// Number of repetitions of the whole transmit sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repetitions {
    Count(u32),
    /// As many repetitions as the trigger table and module memory allow.
    Max,
}

/// An abstract acquisition request.
///
/// Scalar per-transmit fields broadcast over all transmits; the transmit
/// count itself is defined by the aperture centers (LIN/STA) or the angles
/// (PWI).
#[derive(Clone, Debug, PartialEq)]
pub struct TxRxSequence {
    pub kind: ScanKind,
    pub aperture_center: ApertureCenter,
    /// Transmit aperture width, in elements.
    pub aperture_size: PerTx<usize>,
    /// Focal depth in meters; `+inf` transmits a plane wave, negative values
    /// place a virtual source behind the array.
    pub focus: PerTx<f64>,
    /// Steering angle, in radians.
    pub angle: PerTx<f64>,
    /// Speed of sound in the medium, in m/s.
    pub speed_of_sound: f64,
    /// Excitation frequency, in Hz.
    pub tx_frequency: f64,
    /// Number of excitation periods.
    pub tx_n_periods: u32,
    pub rx_window: RxWindow,
    /// Pulse repetition interval, in seconds.
    pub tx_pri: f64,
    pub repetitions: Repetitions,
    /// Sampling clock divider; the record rate is `65 MHz / fs_divider`.
    pub fs_divider: u32,
    /// TGC gain at zero depth, in dB.
    pub tgc_start: f64,
    /// TGC gain slope, in dB/m.
    pub tgc_slope: f64,
}

impl Default for TxRxSequence {
    fn default() -> Self {
        Self {
            kind: ScanKind::Pwi,
            aperture_center: ApertureCenter::Position(PerTx::Uniform(0.0)),
            aperture_size: PerTx::Uniform(128),
            focus: PerTx::Uniform(f64::INFINITY),
            angle: PerTx::Each(vec![0.0]),
            speed_of_sound: 1540.0,
            tx_frequency: 5e6,
            tx_n_periods: 2,
            rx_window: RxWindow::DepthRange {
                min: 0.0,
                max: 50e-3,
            },
            tx_pri: 200e-6,
            repetitions: Repetitions::Count(1),
            fs_divider: 1,
            tgc_start: 14.0,
            tgc_slope: 200.0,
        }
    }
}
