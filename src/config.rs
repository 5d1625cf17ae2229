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

//! Resolved client configuration.
//!
//! A [`Configuration`] names the server endpoint, whether it is a policy
//! (XCEP) or enrollment (WSTEP) endpoint, how the server certificate is
//! verified, and the authentication to use. Loading it from files is left
//! to the caller; the `cepces-submit` binary builds one from its flags.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::CepcesError;
use crate::soap::Authentication;

/// Default poll interval handed to the calling agent, in seconds.
pub const DEFAULT_POLL_INTERVAL: u64 = 6 * 60 * 60;

/// Default timeout of every HTTP request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Kind of the configured endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointType {
    /// An XCEP policy endpoint listing CAs and their enrollment endpoints.
    #[default]
    Policy,
    /// A WSTEP enrollment endpoint used directly.
    Enrollment,
}

impl FromStr for EndpointType {
    type Err = CepcesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Policy" => Ok(Self::Policy),
            "Enrollment" => Ok(Self::Enrollment),
            other => Err(CepcesError::config(format!("Unknown endpoint type: {}", other))),
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy => f.write_str("Policy"),
            Self::Enrollment => f.write_str("Enrollment"),
        }
    }
}

/// Client configuration.
#[derive(Clone)]
pub struct Configuration {
    /// Server endpoint URL.
    pub endpoint: Url,

    /// Whether `endpoint` serves policies or enrollment.
    pub endpoint_type: EndpointType,

    /// Server certificate verification.
    pub trust_anchors: TrustAnchors,

    /// Authentication presented to every endpoint.
    pub auth: Authentication,

    /// Seconds the calling agent should wait before polling a pending
    /// request.
    pub poll_interval: u64,

    /// Request timeout duration.
    pub timeout: Duration,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("endpoint", &self.endpoint.as_str())
            .field("endpoint_type", &self.endpoint_type)
            .field("trust_anchors", &self.trust_anchors)
            .field("auth", &self.auth)
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Configuration {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }
}

/// Builder for [`Configuration`].
#[derive(Default)]
pub struct ConfigurationBuilder {
    endpoint: Option<Url>,
    endpoint_type: EndpointType,
    trust_anchors: Option<TrustAnchors>,
    auth: Option<Authentication>,
    poll_interval: Option<u64>,
    timeout: Option<Duration>,
}

impl ConfigurationBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint URL.
    pub fn endpoint(mut self, url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        self.endpoint = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Set the endpoint from a pre-parsed URL.
    pub fn endpoint_parsed(mut self, url: Url) -> Self {
        self.endpoint = Some(url);
        self
    }

    /// Set the endpoint type.
    pub fn endpoint_type(mut self, endpoint_type: EndpointType) -> Self {
        self.endpoint_type = endpoint_type;
        self
    }

    /// Set the server certificate verification.
    pub fn trust_anchors(mut self, trust_anchors: TrustAnchors) -> Self {
        self.trust_anchors = Some(trust_anchors);
        self
    }

    /// Verify the server against a PEM CA bundle.
    pub fn trust_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.trust_anchors = Some(TrustAnchors::Bundle(path.into()));
        self
    }

    /// Accept any server certificate.
    pub fn disable_verification(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::Disabled);
        self
    }

    /// Set the authentication.
    pub fn auth(mut self, auth: Authentication) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the poll interval in seconds.
    pub fn poll_interval(mut self, seconds: u64) -> Self {
        self.poll_interval = Some(seconds);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not set or the timeout is zero.
    pub fn build(self) -> Result<Configuration, &'static str> {
        let endpoint = self.endpoint.ok_or("endpoint is required")?;
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err("timeout must be greater than zero");
        }

        Ok(Configuration {
            endpoint,
            endpoint_type: self.endpoint_type,
            trust_anchors: self.trust_anchors.unwrap_or(TrustAnchors::WebPki),
            auth: self.auth.unwrap_or(Authentication::Anonymous),
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            timeout,
        })
    }
}

/// Client identity for TLS client certificate authentication.
#[derive(Clone)]
pub struct ClientIdentity {
    /// PEM-encoded certificate chain, client certificate first.
    pub cert_pem: Vec<u8>,

    /// PEM-encoded private key.
    pub key_pem: Vec<u8>,
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_pem", &format!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl ClientIdentity {
    /// Create a new client identity from PEM-encoded data.
    pub fn new(cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    /// Create a client identity from file paths.
    pub fn from_files(
        cert_path: impl AsRef<std::path::Path>,
        key_path: impl AsRef<std::path::Path>,
    ) -> std::io::Result<Self> {
        let cert_pem = std::fs::read(cert_path)?;
        let key_pem = std::fs::read(key_path)?;
        Ok(Self { cert_pem, key_pem })
    }
}

/// Server certificate verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustAnchors {
    /// Use the bundled Mozilla root store.
    WebPki,

    /// Use the CA certificates of a PEM bundle file.
    Bundle(PathBuf),

    /// Accept any server certificate.
    Disabled,
}

impl TrustAnchors {
    /// Interpret a `cas` setting: empty disables verification, anything
    /// else names a CA bundle.
    pub fn from_cas_setting(value: &str) -> Self {
        if value.is_empty() {
            Self::Disabled
        } else {
            Self::Bundle(PathBuf::from(value))
        }
    }
}
