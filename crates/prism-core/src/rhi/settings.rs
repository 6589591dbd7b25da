// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Global settings for the RHI and the resource factory.

use crate::rhi::common::StateQueryMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// A collection of global settings that affect command recording and resource creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhiSettings {
    /// A runtime toggle for CPU and GPU time blocks around named passes.
    pub profiler_enabled: bool,
    /// A runtime toggle for debug annotations around named passes.
    pub markers_enabled: bool,
    /// If `true`, lifecycle and recording calls are rejected from an unexpected state.
    /// If `false`, the violation is logged and the call proceeds.
    pub strict_state_machine: bool,
    /// Upper bound for a blocking GPU query readback.
    pub query_timeout_ms: u64,
    /// First poll interval of a query readback. Doubles on every miss.
    pub query_poll_interval_us: u64,
    /// Upper bound for waiting on a mip chain.
    pub mip_generation_timeout_ms: u64,
    /// The diff oracle used when the backend supports both.
    pub state_query_mode: StateQueryMode,
    /// Maximum anisotropy of the anisotropic sampler.
    pub anisotropy: u32,
    /// Use a reversed depth range (near = 1, far = 0).
    pub reverse_z: bool,
    /// Constant depth bias of the shadow rasterizer states.
    pub depth_bias: f32,
    /// Maximum depth bias of the shadow rasterizer states.
    pub depth_bias_clamp: f32,
    /// Slope-scaled depth bias of the shadow rasterizer states.
    pub depth_bias_slope_scaled: f32,
}

impl Default for RhiSettings {
    fn default() -> Self {
        Self {
            profiler_enabled: true,
            markers_enabled: true,
            strict_state_machine: true,
            query_timeout_ms: 100,
            query_poll_interval_us: 50,
            mip_generation_timeout_ms: 10_000,
            state_query_mode: StateQueryMode::Live,
            anisotropy: 16,
            reverse_z: true,
            depth_bias: 0.005,
            depth_bias_clamp: 0.0,
            depth_bias_slope_scaled: 2.0,
        }
    }
}

impl RhiSettings {
    /// Parses settings from JSON. Missing fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(json).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// The query readback timeout as a [`Duration`].
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// The initial query poll interval as a [`Duration`].
    pub fn query_poll_interval(&self) -> Duration {
        Duration::from_micros(self.query_poll_interval_us.max(1))
    }

    /// The mip generation timeout as a [`Duration`].
    pub fn mip_generation_timeout(&self) -> Duration {
        Duration::from_millis(self.mip_generation_timeout_ms)
    }
}

/// An error raised while loading [`RhiSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The settings file could not be read.
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        message: String,
    },
    /// The settings text is not valid JSON for [`RhiSettings`].
    Parse(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io { path, message } => {
                write!(f, "Failed to read settings from '{path}': {message}")
            }
            SettingsError::Parse(msg) => write!(f, "Failed to parse settings: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = RhiSettings::from_json_str(r#"{ "markers_enabled": false }"#).unwrap();
        assert!(!settings.markers_enabled);
        assert!(settings.profiler_enabled);
        assert!(settings.strict_state_machine);
        assert_eq!(settings.state_query_mode, StateQueryMode::Live);
    }

    #[test]
    fn json_round_trip() {
        let mut settings = RhiSettings::default();
        settings.state_query_mode = StateQueryMode::CacheOnly;
        settings.anisotropy = 4;
        let json = settings.to_json_string().unwrap();
        assert!(json.contains("cache_only"));
        assert_eq!(RhiSettings::from_json_str(&json).unwrap(), settings);
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = RhiSettings::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = RhiSettings::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn poll_interval_is_never_zero() {
        let settings = RhiSettings {
            query_poll_interval_us: 0,
            ..Default::default()
        };
        assert_eq!(settings.query_poll_interval(), Duration::from_micros(1));
    }
}
