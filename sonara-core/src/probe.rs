use getset::{CopyGetters, Getters};

use crate::error::ConfigError;

/// A linear-array probe: element centers lie on a line, symmetric around the
/// origin.
#[derive(Clone, Debug, PartialEq, Getters, CopyGetters)]
pub struct Probe {
    #[getset(get = "pub")]
    name: String,
    /// Number of piezoelectric elements.
    #[getset(get_copy = "pub")]
    n_elem: usize,
    /// Element center-to-center distance, in meters.
    #[getset(get_copy = "pub")]
    pitch: f64,
}

impl Probe {
    #[must_use]
    pub fn new(name: impl Into<String>, n_elem: usize, pitch: f64) -> Self {
        Self {
            name: name.into(),
            n_elem,
            pitch,
        }
    }

    /// Looks up a probe model by its catalogue name.
    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "SL1543" => Ok(Self::new(name, 192, 0.245e-3)),
            "AL2442" => Ok(Self::new(name, 192, 0.21e-3)),
            "SP2430" => Ok(Self::new(name, 96, 0.22e-3)),
            "L14-5/38" => Ok(Self::new(name, 128, 0.3048e-3)),
            _ => Err(ConfigError::UnknownProbe(name.to_string())),
        }
    }

    /// Lateral position of the center of element `i`, in meters.
    #[must_use]
    pub fn x_elem(&self, i: usize) -> f64 {
        (i as f64 - (self.n_elem as f64 - 1.0) / 2.0) * self.pitch
    }

    /// Positions of all element centers, in meters.
    #[must_use]
    pub fn element_positions(&self) -> Vec<f64> {
        (0..self.n_elem).map(|i| self.x_elem(i)).collect()
    }

    /// Fractional element index whose center lies at lateral position `x`.
    ///
    /// The inverse of [`Self::x_elem`]; not clamped to the array extent.
    #[must_use]
    pub fn element_at(&self, x: f64) -> f64 {
        x / self.pitch + (self.n_elem as f64 - 1.0) / 2.0
    }

    /// Lateral position at a fractional element index.
    #[must_use]
    pub fn x_at(&self, index: f64) -> f64 {
        (index - (self.n_elem as f64 - 1.0) / 2.0) * self.pitch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elements_are_symmetric_around_origin() {
        let probe = Probe::by_name("SL1543").unwrap();
        assert_eq!(192, probe.n_elem());
        let first = probe.x_elem(0);
        let last = probe.x_elem(probe.n_elem() - 1);
        approx::assert_abs_diff_eq!(first, -last, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(
            probe.x_elem(96) - probe.x_elem(95),
            probe.pitch(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn element_at_inverts_x_elem() {
        let probe = Probe::by_name("SP2430").unwrap();
        for i in [0usize, 1, 47, 95] {
            approx::assert_abs_diff_eq!(
                probe.element_at(probe.x_elem(i)),
                i as f64,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn unknown_probe_is_rejected() {
        assert_eq!(
            Probe::by_name("XYZ"),
            Err(ConfigError::UnknownProbe("XYZ".to_string()))
        );
    }
}
