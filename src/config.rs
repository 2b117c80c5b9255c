//! Tunables for the list engine and the download manager.
//!
//! Both structs are serde-friendly so a hosting application can carry them
//! in its own configuration file; defaults match the values the log viewer
//! ships with. `validate()` rejects combinations that would wedge the
//! engines (zero-sized chunks, inverted tolerances and the like).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tunables for [`crate::window::WindowedListEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Extra rows rendered beyond the visible window. A floor of 1 is
    /// applied at use, so keyboard focus can traverse rendered boundaries
    /// even when this is 0.
    pub overscan_count: usize,

    /// How long after the last scroll event the engine stays in the
    /// `scrolling` state.
    #[serde(with = "duration_millis")]
    pub scroll_debounce: Duration,

    /// Ceiling on the physical (scrollbar-backed) size of the list, in
    /// pixels. When `item_count * item_size` exceeds this, the engine
    /// switches to the compressed scroll space.
    pub max_physical_size: f64,

    /// In compressed mode, remap when the physical offset comes within
    /// this fraction of the physical size of either boundary.
    pub boundary_buffer_ratio: f64,

    /// In compressed mode, remap when the relative physical position
    /// drifts from the relative logical position by more than this, while
    /// actively scrolling...
    pub drift_tolerance_scrolling: f64,

    /// ...or by more than this, at rest.
    pub drift_tolerance_idle: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            overscan_count: 2,
            scroll_debounce: Duration::from_millis(150),
            max_physical_size: 15_000_000.0,
            boundary_buffer_ratio: 0.05,
            drift_tolerance_scrolling: 0.05,
            drift_tolerance_idle: 0.2,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_physical_size <= 0.0 {
            return Err(ConfigError::ValidationError(
                "max_physical_size must be positive".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&self.boundary_buffer_ratio) {
            return Err(ConfigError::ValidationError(
                "boundary_buffer_ratio must be in [0, 0.5)".to_string(),
            ));
        }
        if self.drift_tolerance_scrolling > self.drift_tolerance_idle {
            return Err(ConfigError::ValidationError(
                "drift_tolerance_scrolling must not exceed drift_tolerance_idle".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tunables for [`crate::manager::ChunkedLogDownloadManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// A download is initiated once undownloaded lines come within this
    /// many rows of the visible range.
    pub download_initiate_overscan_row_count: u64,

    /// How many rows beyond the visible range each download aims to cover.
    pub download_overscan_row_count: u64,

    /// Chunks entirely outside the visible range expanded by this many
    /// rows are evicted.
    pub cached_download_overscan_row_count: u64,

    /// Rendered-line cache entries outside the rendered range expanded by
    /// this many rows are pruned.
    pub cache_rendered_overscan_row_count: u64,

    /// Upper bound on the line count of a single request and of a merged
    /// chunk.
    pub max_chunk_lines_count: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_initiate_overscan_row_count: 15,
            download_overscan_row_count: 35,
            cached_download_overscan_row_count: 120,
            cache_rendered_overscan_row_count: 30,
            max_chunk_lines_count: 1000,
        }
    }
}

impl DownloadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chunk_lines_count == 0 {
            return Err(ConfigError::ValidationError(
                "max_chunk_lines_count must be positive".to_string(),
            ));
        }
        if self.cached_download_overscan_row_count < self.download_overscan_row_count {
            return Err(ConfigError::ValidationError(
                "cached_download_overscan_row_count must cover download_overscan_row_count, \
                 otherwise freshly downloaded chunks are immediately evicted"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        WindowConfig::default().validate().unwrap();
        DownloadConfig::default().validate().unwrap();
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = DownloadConfig {
            max_chunk_lines_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_eviction_window_must_cover_download_overscan() {
        let config = DownloadConfig {
            download_overscan_row_count: 50,
            cached_download_overscan_row_count: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_drift_tolerances_rejected() {
        let config = WindowConfig {
            drift_tolerance_scrolling: 0.3,
            drift_tolerance_idle: 0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = WindowConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: WindowConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.overscan_count, config.overscan_count);
        assert_eq!(back.scroll_debounce, config.scroll_debounce);
    }
}
