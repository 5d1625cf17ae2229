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

//! Authentication capabilities for SOAP endpoints.
//!
//! An [`Authentication`] contributes up to three things to an exchange: a
//! transport credential (the SPNEGO `Authorization` header), a TLS client
//! certificate, and a post-processing step that secures the envelope before
//! it is serialized.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::ClientIdentity;
use crate::error::{BindingError, CepcesError, Result};
use crate::soap::types::Envelope;
use crate::xml::{Document, XsDateTime};

/// Authentication method identifiers as advertised by XCEP `clientAuthentication`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// No authentication.
    Anonymous,
    /// Kerberos (SPNEGO) on the transport.
    Kerberos,
    /// WS-Security username token in the message.
    UsernamePassword,
    /// TLS client certificate.
    Certificate,
}

impl AuthMethod {
    /// Map a wire value (1, 2, 4 or 8).
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Anonymous),
            2 => Some(Self::Kerberos),
            4 => Some(Self::UsernamePassword),
            8 => Some(Self::Certificate),
            _ => None,
        }
    }

    /// Wire value of this method.
    pub fn wire_value(self) -> i64 {
        match self {
            Self::Anonymous => 1,
            Self::Kerberos => 2,
            Self::UsernamePassword => 4,
            Self::Certificate => 8,
        }
    }

    /// Parse a configured method name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "Anonymous" => Ok(Self::Anonymous),
            "Kerberos" => Ok(Self::Kerberos),
            "UsernamePassword" => Ok(Self::UsernamePassword),
            "Certificate" => Ok(Self::Certificate),
            other => Err(CepcesError::config(format!(
                "Unknown authentication method: {}",
                other
            ))),
        }
    }

    /// Configuration name of this method.
    pub fn name(self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::Kerberos => "Kerberos",
            Self::UsernamePassword => "UsernamePassword",
            Self::Certificate => "Certificate",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Producer of SPNEGO tokens for HTTP Negotiate authentication.
///
/// Credential acquisition lives outside this crate; implementations wrap
/// whatever GSSAPI binding the host provides.
#[async_trait]
pub trait NegotiateTokenSource: Send + Sync {
    /// Initial context token for the service at `target`.
    async fn token(&self, target: &Url, delegate: bool) -> Result<Vec<u8>>;
}

/// Host based service name (`service@host`) of the endpoint at `target`.
pub fn service_principal(service: &str, target: &Url) -> Result<String> {
    let host = target
        .host_str()
        .ok_or_else(|| CepcesError::authentication(format!("No host in {}", target)))?;
    Ok(format!("{}@{}", service, host.to_ascii_lowercase()))
}

/// Kerberos transport authentication.
#[derive(Clone)]
pub struct KerberosAuthentication {
    source: Arc<dyn NegotiateTokenSource>,
    delegate: bool,
}

impl KerberosAuthentication {
    /// Create from a token source. Credentials are delegated by default.
    pub fn new(source: Arc<dyn NegotiateTokenSource>) -> Self {
        Self {
            source,
            delegate: true,
        }
    }

    /// Set whether credentials are delegated to the service.
    pub fn delegate(mut self, delegate: bool) -> Self {
        self.delegate = delegate;
        self
    }
}

/// Message level username/password credentials.
#[derive(Clone)]
pub struct UsernamePassword {
    username: String,
    password: String,
    created: XsDateTime,
    nonce: String,
}

impl UsernamePassword {
    /// Create credentials stamped with the current time.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::created_at(username, password, XsDateTime::now_utc())
    }

    /// Create credentials with an explicit creation time.
    pub fn created_at(
        username: impl Into<String>,
        password: impl Into<String>,
        created: XsDateTime,
    ) -> Self {
        let username = username.into();
        let password = password.into();
        let digest = Sha256::digest(format!("{}:{}:{}", username, password, created));
        let nonce = BASE64_STANDARD.encode(&digest[..16]);
        Self {
            username,
            password,
            created,
            nonce,
        }
    }

    /// Username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Nonce sent with the token.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Creation time sent with the token.
    pub fn created(&self) -> XsDateTime {
        self.created
    }
}

/// Resolved authentication capability.
#[derive(Clone)]
pub enum Authentication {
    /// No credentials.
    Anonymous,
    /// SPNEGO on the transport.
    Kerberos(KerberosAuthentication),
    /// WS-Security username token.
    UsernamePassword(UsernamePassword),
    /// TLS client certificate.
    Certificate(ClientIdentity),
}

impl Authentication {
    /// Method identifier used to match XCEP endpoint URIs.
    pub fn method(&self) -> AuthMethod {
        match self {
            Self::Anonymous => AuthMethod::Anonymous,
            Self::Kerberos(_) => AuthMethod::Kerberos,
            Self::UsernamePassword(_) => AuthMethod::UsernamePassword,
            Self::Certificate(_) => AuthMethod::Certificate,
        }
    }

    /// TLS client certificate, if this method presents one.
    pub fn client_identity(&self) -> Option<&ClientIdentity> {
        match self {
            Self::Certificate(identity) => Some(identity),
            _ => None,
        }
    }

    /// Secure an outgoing envelope.
    pub fn post_process(
        &self,
        doc: &mut Document,
        envelope: Envelope,
    ) -> std::result::Result<(), BindingError> {
        let Self::UsernamePassword(credentials) = self else {
            return Ok(());
        };
        let header = envelope
            .header(doc)
            .ok_or_else(|| BindingError::NoSuchElement("Header".to_string()))?;
        let security = header.ensure_security(doc);
        let token = security.add_username_token(doc);
        token.set_username(doc, &credentials.username)?;
        token.set_password(doc, &credentials.password)?;
        token.set_nonce(doc, &credentials.nonce)?;
        token.set_created(doc, credentials.created)?;
        Ok(())
    }

    /// Add the transport credential to a request.
    pub async fn apply(&self, request: RequestBuilder, target: &Url) -> Result<RequestBuilder> {
        match self {
            Self::Kerberos(kerberos) => {
                let token = kerberos.source.token(target, kerberos.delegate).await?;
                Ok(request.header(
                    AUTHORIZATION,
                    format!("Negotiate {}", BASE64_STANDARD.encode(token)),
                ))
            }
            _ => Ok(request),
        }
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Kerberos(k) => f
                .debug_struct("Kerberos")
                .field("delegate", &k.delegate)
                .finish_non_exhaustive(),
            Self::UsernamePassword(c) => f
                .debug_struct("UsernamePassword")
                .field("username", &c.username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Certificate(_) => write!(f, "Certificate([REDACTED])"),
        }
    }
}
