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

//! Polling cookie exchanged with certmonger.
//!
//! A pending submission prints `"<poll interval>\n<request id>,<reference>"`.
//! certmonger consumes the first line as the delay and hands the rest back
//! in `CERTMONGER_CA_COOKIE`, so parsing accepts both forms.

use std::fmt;
use std::str::FromStr;

use crate::error::CepcesError;

/// Pending request state persisted by certmonger between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Seconds to wait before polling; absent in the form certmonger returns.
    pub poll_interval: Option<u64>,
    /// Server side request ID.
    pub request_id: u32,
    /// Enrollment endpoint to poll.
    pub reference: String,
}

impl Cookie {
    /// Cookie printed after a pending submission.
    pub fn new(poll_interval: u64, request_id: u32, reference: impl Into<String>) -> Self {
        Self {
            poll_interval: Some(poll_interval),
            request_id,
            reference: reference.into(),
        }
    }
}

impl FromStr for Cookie {
    type Err = CepcesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CepcesError::config(format!("Invalid cookie: {:?}", s));

        let text = s.trim_end_matches(['\r', '\n']);

        // A leading line is the interval only when the ID pair follows it.
        let (poll_interval, rest) = match text.split_once('\n') {
            Some((interval, rest)) if rest.contains(',') => (
                Some(interval.trim().parse::<u64>().map_err(|_| invalid())?),
                rest,
            ),
            _ => (None, text),
        };
        let (request_id, reference) = rest.split_once(',').ok_or_else(invalid)?;
        let request_id = request_id.trim().parse::<u32>().map_err(|_| invalid())?;
        if reference.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            poll_interval,
            request_id,
            reference: reference.to_string(),
        })
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(interval) = self.poll_interval {
            writeln!(f, "{}", interval)?;
        }
        write!(f, "{},{}", self.request_id, self.reference)
    }
}
