// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Access to configuration values.
//!
//! Settings are read through [`Environment`]. Embedders pass [`SystemEnvironment`] to read the
//! process environment, tests pass a [`MapEnvironment`].

use std::collections::HashMap;

const TRUTHY: [&str; 6] = ["true", "1", "yes", "on", "enabled", "enable"];
const FALSY: [&str; 6] = ["false", "0", "no", "off", "disabled", "disable"];

pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Read a boolean flag, falling back to `default_value` when `key` is unset
    fn enabled(&self, key: &str, default_value: bool) -> Result<bool, EnvError> {
        let Some(value) = self.get(key) else {
            return Ok(default_value);
        };
        let lowered = value.to_lowercase();

        if TRUTHY.contains(&lowered.as_str()) {
            Ok(true)
        } else if FALSY.contains(&lowered.as_str()) {
            Ok(false)
        } else {
            Err(EnvError::InvalidBoolean {
                key: key.to_string(),
                value,
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("{key} must be a boolean flag (true/false, 1/0, yes/no, on/off), got '{value}'")]
    InvalidBoolean { key: String, value: String },

    #[error("{key} has unsupported value '{value}': expected {expected}")]
    InvalidChoice {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// The process environment
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Default, Debug)]
pub struct MapEnvironment {
    values: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Environment for MapEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MapEnvironment {
    fn from(values: [(&str, &str); N]) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}
