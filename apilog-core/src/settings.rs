//! File-backed capture settings.
//!
//! The serializable part of an [`InterceptorConfig`](crate::config::InterceptorConfig).
//! Sinks and closures cannot live in a file, so filters are expressed as
//! regular expressions over the dump text.
//!
//! ```toml
//! capture_full_request = true
//! request_pattern = "^GET /bigquery/"
//! scopes = ["https://www.googleapis.com/auth/bigquery"]
//! ```

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ApiLogError, ApiLogResult, ConfigError};

/// Capture settings loadable from JSON, YAML or TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Override for the auth scope list
    pub scopes: Option<Vec<String>>,
    /// Include request bodies in dumps
    pub capture_full_request: bool,
    /// Include response bodies in dumps
    pub capture_full_response: bool,
    /// Log only requests whose dump matches this pattern
    pub request_pattern: Option<String>,
    /// Log only responses whose dump matches this pattern
    pub response_pattern: Option<String>,
}

impl CaptureSettings {
    /// Load settings from a file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> ApiLogResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_e| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let invalid = |reason: String| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason,
        };

        let settings: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            _ => {
                return Err(invalid(
                    "Unsupported file format. Use .json, .yaml, or .toml".to_string(),
                )
                .into())
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a file, picking the format from its extension.
    pub fn to_file(&self, path: impl AsRef<Path>) -> ApiLogResult<()> {
        let path = path.as_ref();
        let invalid = |reason: String| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason,
        };

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::to_string(self).map_err(|e| invalid(e.to_string()))?
            }
            Some("toml") => toml::to_string_pretty(self).map_err(|e| invalid(e.to_string()))?,
            _ => {
                return Err(invalid(
                    "Unsupported file format. Use .json, .yaml, or .toml".to_string(),
                )
                .into())
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that patterns compile and scopes are usable.
    pub fn validate(&self) -> ApiLogResult<()> {
        if let Some(scopes) = &self.scopes {
            if let Some(bad) = scopes.iter().find(|s| s.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    parameter: "scopes".to_string(),
                    value: format!("{:?}", bad),
                    reason: "Scopes must not be blank".to_string(),
                }
                .into());
            }
        }
        self.request_regex()?;
        self.response_regex()?;
        Ok(())
    }

    pub(crate) fn request_regex(&self) -> ApiLogResult<Option<Regex>> {
        compile("request_pattern", self.request_pattern.as_deref())
    }

    pub(crate) fn response_regex(&self) -> ApiLogResult<Option<Regex>> {
        compile("response_pattern", self.response_pattern.as_deref())
    }
}

fn compile(parameter: &str, pattern: Option<&str>) -> ApiLogResult<Option<Regex>> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| {
                ApiLogError::from(ConfigError::InvalidValue {
                    parameter: parameter.to_string(),
                    value: p.to_string(),
                    reason: e.to_string(),
                })
            })
        })
        .transpose()
}
