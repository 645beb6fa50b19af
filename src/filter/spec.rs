//! Validated filter specifications.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use serde_json::Value;

use crate::config::{FilterDefinition, Phase};

/// Immutable, validated form of a `FilterDefinition`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    name: String,
    id: String,
    phase: Phase,
    error_status: Option<StatusCode>,
    options: BTreeMap<String, Value>,
}

impl FilterSpec {
    pub fn from_definition(def: &FilterDefinition) -> Result<Self, String> {
        if def.name.trim().is_empty() {
            return Err("filter name must not be empty".to_string());
        }

        let error_status = match def.error_status {
            None => None,
            Some(code) => match StatusCode::from_u16(code) {
                Ok(status) if status.is_client_error() || status.is_server_error() => Some(status),
                _ => return Err(format!("error_status {} is not a 4xx/5xx status", code)),
            },
        };

        Ok(Self {
            name: def.name.clone(),
            id: def.id.clone().unwrap_or_else(|| def.name.clone()),
            phase: def.phase,
            error_status,
            options: def.options.clone(),
        })
    }

    /// Registered filter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance id; pre and post halves with the same id form one stage.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error_status(&self) -> StatusCode {
        self.error_status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// Fail unless the spec runs in one of `phases`.
    pub fn expect_phase(&self, phases: &[Phase]) -> Result<(), String> {
        if phases.contains(&self.phase) {
            Ok(())
        } else {
            Err(format!("not supported in {} phase", self.phase))
        }
    }

    /// Fail on options not listed in `allowed` (catches typos at load time).
    pub fn allow_options(&self, allowed: &[&str]) -> Result<(), String> {
        match self.options.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(unknown) => Err(format!("unknown option '{}'", unknown)),
            None => Ok(()),
        }
    }

    pub fn str_option(&self, key: &str) -> Result<Option<&str>, String> {
        match self.options.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(format!("option '{}' must be a string, got {}", key, other)),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<&str, String> {
        self.str_option(key)?
            .ok_or_else(|| format!("missing required option '{}'", key))
    }

    pub fn bool_option(&self, key: &str, default: bool) -> Result<bool, String> {
        match self.options.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(format!("option '{}' must be a boolean, got {}", key, other)),
        }
    }

    pub fn u16_option(&self, key: &str) -> Result<Option<u16>, String> {
        match self.options.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| format!("option '{}' must be a small integer, got {}", key, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_defaults_to_name() {
        let spec = FilterSpec::from_definition(&FilterDefinition::new("Logger", Phase::Pre)).unwrap();
        assert_eq!(spec.id(), "Logger");
        assert_eq!(spec.error_status(), StatusCode::INTERNAL_SERVER_ERROR);

        let spec = FilterSpec::from_definition(
            &FilterDefinition::new("Logger", Phase::Post).with_id("audit"),
        )
        .unwrap();
        assert_eq!(spec.id(), "audit");
    }

    #[test]
    fn test_error_status_must_be_an_error() {
        let ok = FilterDefinition::new("X", Phase::Pre).with_error_status(503);
        assert_eq!(
            FilterSpec::from_definition(&ok).unwrap().error_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let bad = FilterDefinition::new("X", Phase::Pre).with_error_status(200);
        assert!(FilterSpec::from_definition(&bad).is_err());
    }

    #[test]
    fn test_typed_options() {
        let spec = FilterSpec::from_definition(
            &FilterDefinition::new("X", Phase::Pre)
                .with_option("name", "x-a")
                .with_option("flag", true)
                .with_option("status", 403),
        )
        .unwrap();

        assert_eq!(spec.required_str("name").unwrap(), "x-a");
        assert!(spec.required_str("missing").is_err());
        assert!(spec.bool_option("flag", false).unwrap());
        assert!(spec.bool_option("name", false).is_err());
        assert_eq!(spec.u16_option("status").unwrap(), Some(403));
        assert!(spec.allow_options(&["name", "flag", "status"]).is_ok());
        assert!(spec.allow_options(&["name"]).is_err());
        assert!(spec.expect_phase(&[Phase::Post]).is_err());
    }
}
