// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
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

//! Snapshot of the `CERTMONGER_*` variables.

use std::collections::HashMap;

use crate::error::{CepcesError, Result};

/// Operation to perform.
pub const OPERATION: &str = "CERTMONGER_OPERATION";
/// PEM encoded certificate signing request.
pub const CSR: &str = "CERTMONGER_CSR";
/// Existing certificate; set when renewing.
pub const CERTIFICATE: &str = "CERTMONGER_CERTIFICATE";
/// Requested template.
pub const CA_PROFILE: &str = "CERTMONGER_CA_PROFILE";
/// Cookie of a pending request.
pub const CA_COOKIE: &str = "CERTMONGER_CA_COOKIE";

const PREFIX: &str = "CERTMONGER_";

/// Immutable view of the helper's environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        std::env::vars()
            .filter(|(name, _)| name.starts_with(PREFIX))
            .collect()
    }

    /// Value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Value of `name`, or `MissingEnvironmentVariable`.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| CepcesError::MissingEnvironmentVariable(name.to_string()))
    }

    /// Requested operation name.
    pub fn operation(&self) -> Option<&str> {
        self.get(OPERATION)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
