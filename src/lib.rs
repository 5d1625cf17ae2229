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

//! # usg-cepces
//!
//! A client for Microsoft's certificate enrollment web services: MS-XCEP
//! (policy discovery) and MS-WSTEP (issuance and polling), with a certmonger
//! CA helper on top.
//!
//! ## Features
//!
//! - **Async-first design** using Tokio and reqwest
//! - **Policy discovery**: templates, issuing CAs and their enrollment endpoints
//! - **Enrollment**: submit a PKCS#10 request, poll pending requests
//! - **CA chain reconstruction** by following Authority Information Access
//!   links, with partial results on failure
//! - **certmonger integration** through the `cepces-submit` binary
//!
//! ## Quick Start
//!
//! ```no_run
//! use usg_cepces::{CepcesClient, Configuration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Configuration::builder()
//!         .endpoint("https://ca.example.com/ADPolicyProvider_CEP_UsernamePassword/service.svc/CEP")?
//!         .build()?;
//!
//!     let client = CepcesClient::new(config).await?;
//!     for endpoint in client.endpoints()?.unwrap_or_default() {
//!         println!("{} (priority {:?})", endpoint, endpoint.priority);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Certificate Enrollment
//!
//! ```no_run
//! use usg_cepces::{CepcesClient, Configuration, EnrollmentStatus};
//!
//! # async fn example(csr_pem: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Configuration::builder()
//!     .endpoint("https://ca.example.com/CEP")?
//!     .build()?;
//! let client = CepcesClient::new(config).await?;
//!
//! match client.request(csr_pem, false, None).await? {
//!     Some(result) => match result.status {
//!         EnrollmentStatus::Issued(certificate) => {
//!             println!("Issued: {:?}", certificate.tbs_certificate.subject);
//!         }
//!         EnrollmentStatus::Pending(reference) => {
//!             println!("Pending request {:?} at {}", result.request_id, reference);
//!         }
//!     },
//!     None => println!("No usable enrollment endpoint"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod certmonger;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod soap;
pub mod tls;
pub mod wstep;
pub mod xcep;
pub mod xml;

// Re-export main types at crate root for convenience
pub use chain::ChainResolver;
pub use client::{CepcesClient, CertificateService, EnrollmentResult, EnrollmentStatus};
pub use config::{ClientIdentity, Configuration, ConfigurationBuilder, EndpointType, TrustAnchors};
pub use error::{BindingError, CepcesError, Result};
pub use soap::{AuthMethod, Authentication};
pub use xcep::Endpoint;

// Re-export x509_cert::Certificate for convenience
pub use x509_cert::Certificate;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use tls::USER_AGENT;
