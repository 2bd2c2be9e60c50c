use getset::CopyGetters;

use crate::defined::{OEM_RX_CHANNELS, OEM_TX_CHANNELS};
use crate::error::ConfigError;

/// Wiring variant between OEM channels and probe elements.
///
/// The adapter decides which addressable element each (channel, module) pair
/// serves and therefore how apertures are partitioned and how acquired
/// buffers are reassembled. It is fixed for the life of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterType {
    /// Consecutive blocks: module `k` serves elements `[128k, 128(k+1))`.
    Packed,
    /// Every module sees all 128 addressable channels, but owns only every
    /// `nOEM`-th group of 32.
    Interleaved,
}

impl AdapterType {
    /// Addressable element index served by `channel` on module `oem`.
    #[must_use]
    pub const fn select_elem(&self, channel: usize, oem: usize) -> usize {
        match self {
            AdapterType::Packed => channel + OEM_TX_CHANNELS * oem,
            AdapterType::Interleaved => channel,
        }
    }

    /// Whether `channel` on module `oem` is wired to any element at all.
    #[must_use]
    pub const fn owns_channel(&self, channel: usize, oem: usize, n_oem: usize) -> bool {
        match self {
            AdapterType::Packed => true,
            AdapterType::Interleaved => (channel / OEM_RX_CHANNELS) % n_oem == oem,
        }
    }

    /// Whether `channel` on module `oem` is wired to an existing element.
    #[must_use]
    pub const fn is_active(
        &self,
        channel: usize,
        oem: usize,
        n_oem: usize,
        n_elem: usize,
    ) -> bool {
        self.owns_channel(channel, oem, n_oem) && self.select_elem(channel, oem) < n_elem
    }

    /// Width of the physical receive aperture available per transmit.
    #[must_use]
    pub const fn rx_aperture_size(&self, n_oem: usize) -> usize {
        match self {
            AdapterType::Packed => OEM_RX_CHANNELS,
            AdapterType::Interleaved => OEM_RX_CHANNELS * n_oem,
        }
    }
}

/// Logical-to-physical lane maps of the probe adapter.
#[derive(Clone, Debug, PartialEq, CopyGetters)]
pub struct ChannelMapping {
    #[getset(get_copy = "pub")]
    n_oem: usize,
    tx: Vec<Vec<u16>>,
    rx: Vec<Vec<u16>>,
}

impl ChannelMapping {
    /// Identity mapping: logical channel `c` of module `k` is lane
    /// `k * width + c`.
    pub fn identity(n_oem: usize) -> Result<Self, ConfigError> {
        let tx = (0..n_oem)
            .map(|k| {
                (0..OEM_TX_CHANNELS)
                    .map(|c| (k * OEM_TX_CHANNELS + c) as u16)
                    .collect()
            })
            .collect();
        let rx = (0..n_oem)
            .map(|k| {
                (0..OEM_RX_CHANNELS)
                    .map(|c| (k * OEM_RX_CHANNELS + c) as u16)
                    .collect()
            })
            .collect();
        Self::from_maps(n_oem, tx, rx)
    }

    /// Builds a mapping from explicit per-module lane tables.
    pub fn from_maps(
        n_oem: usize,
        tx: Vec<Vec<u16>>,
        rx: Vec<Vec<u16>>,
    ) -> Result<Self, ConfigError> {
        if n_oem == 0 {
            return Err(ConfigError::NoModules);
        }
        Self::check_map(&tx, n_oem, OEM_TX_CHANNELS, true)?;
        Self::check_map(&rx, n_oem, OEM_RX_CHANNELS, false)?;
        Ok(Self { n_oem, tx, rx })
    }

    fn check_map(
        map: &[Vec<u16>],
        n_oem: usize,
        width: usize,
        is_tx: bool,
    ) -> Result<(), ConfigError> {
        let limit = n_oem * width;
        for (oem, lanes) in map.iter().enumerate() {
            if lanes.len() != width {
                return Err(ConfigError::MapLengthMismatch {
                    oem,
                    expected: width,
                    actual: lanes.len(),
                });
            }
            for &lane in lanes {
                if lane as usize >= limit {
                    return Err(if is_tx {
                        ConfigError::TxMapOutOfRange {
                            value: lane as usize,
                            limit,
                        }
                    } else {
                        ConfigError::RxMapOutOfRange {
                            value: lane as usize,
                            limit,
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// TX lane table of module `oem`.
    #[must_use]
    pub fn tx_map(&self, oem: usize) -> &[u16] {
        &self.tx[oem]
    }

    /// RX lane table of module `oem`.
    #[must_use]
    pub fn rx_map(&self, oem: usize) -> &[u16] {
        &self.rx[oem]
    }
}
