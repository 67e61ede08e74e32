use serde::{Deserialize, Serialize};

use crate::data::FilterSettings;
use crate::error::{SegError, SegResult};
use crate::interaction::{BrushTuning, TimelineTuning};

pub const SESSION_CONFIG_JSON_SCHEMA_V1: u32 = 1;

/// Serializable session setup.
///
/// Hosts persist this between runs instead of inventing their own settings
/// format; every field falls back to its default when missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timeline: TimelineTuning,
    pub brush: BrushTuning,
    pub filters: FilterSettings,
    /// Refuse splits that would leave a half without interior samples.
    pub split_guard: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineTuning::default(),
            brush: BrushTuning::default(),
            filters: FilterSettings::default(),
            split_guard: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfigJsonContractV1 {
    pub schema_version: u32,
    pub config: SessionConfig,
}

impl SessionConfig {
    #[must_use]
    pub fn with_filters(mut self, filters: FilterSettings) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_split_guard(mut self, enabled: bool) -> Self {
        self.split_guard = enabled;
        self
    }

    pub fn validate(self) -> SegResult<Self> {
        self.timeline.validate()?;
        self.brush.validate()?;
        Ok(self)
    }

    pub fn to_json_pretty(self) -> SegResult<String> {
        let payload = SessionConfigJsonContractV1 {
            schema_version: SESSION_CONFIG_JSON_SCHEMA_V1,
            config: self,
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            SegError::InvalidData(format!("failed to serialize session config: {e}"))
        })
    }

    /// Accepts either a bare config object or a versioned payload.
    pub fn from_json_str(input: &str) -> SegResult<Self> {
        if let Ok(payload) = serde_json::from_str::<SessionConfigJsonContractV1>(input) {
            if payload.schema_version != SESSION_CONFIG_JSON_SCHEMA_V1 {
                return Err(SegError::InvalidData(format!(
                    "unsupported session config schema version: {}",
                    payload.schema_version
                )));
            }
            return payload.config.validate();
        }
        let config: Self = serde_json::from_str(input).map_err(|e| {
            SegError::InvalidData(format!("failed to parse session config json: {e}"))
        })?;
        config.validate()
    }
}
