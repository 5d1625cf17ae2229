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

//! Minimal SOAP 1.2 support: envelope models, authentication and transport.
//!
//! Only what the XCEP and WSTEP exchanges need is modelled. Faults arrive as
//! HTTP 500 responses carrying a `s:Fault` body and surface as
//! [`CepcesError::SoapFault`](crate::error::CepcesError::SoapFault).

pub mod auth;
#[cfg(feature = "kerberos")]
pub mod gssapi;
pub mod service;
pub mod types;

pub use auth::{
    service_principal, AuthMethod, Authentication, KerberosAuthentication, NegotiateTokenSource,
    UsernamePassword,
};
#[cfg(feature = "kerberos")]
pub use gssapi::GssapiTokenSource;
pub use service::Service;
pub use types::{Body, Envelope, Fault, Header, Security, UsernameToken};
