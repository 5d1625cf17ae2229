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

//! certmonger CA helper protocol.
//!
//! certmonger runs the helper once per operation, passing its inputs in
//! `CERTMONGER_*` environment variables and reading the outcome from stdout
//! and the exit status. This module maps those invocations onto a
//! [`CertificateService`](crate::client::CertificateService).

pub mod cookie;
pub mod environment;
pub mod operation;

pub use cookie::Cookie;
pub use environment::Environment;
pub use operation::Operation;

/// Exit codes understood by certmonger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    /// Certificate issued, or informational operation succeeded.
    Issued = 0,
    /// Try again later.
    Wait = 1,
    /// The CA rejected the request.
    Rejected = 2,
    /// The CA could not be reached.
    ConnectError = 3,
    /// The helper lacks required configuration.
    Underconfigured = 4,
    /// Pending; poll with the printed cookie after the printed delay.
    WaitMore = 5,
    /// The operation is not supported.
    Unsupported = 6,
}

impl ResultCode {
    /// Result of an informational operation.
    pub const DEFAULT: Self = Self::Issued;

    /// Numeric exit status.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ResultCode> for std::process::ExitCode {
    fn from(result: ResultCode) -> Self {
        std::process::ExitCode::from(result.code())
    }
}
