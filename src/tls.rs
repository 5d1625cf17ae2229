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

//! HTTP client construction.
//!
//! Every exchange (policy fetch, enrollment, AIA downloads) goes through one
//! `reqwest` client carrying the configured timeout, trust anchors and, for
//! certificate authentication, the TLS client identity.

use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use crate::config::{ClientIdentity, Configuration, TrustAnchors};
use crate::error::{CepcesError, Result};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("usg-cepces/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest Client with the appropriate TLS configuration.
pub fn build_http_client(config: &Configuration) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT)
        .use_rustls_tls()
        .min_tls_version(reqwest::tls::Version::TLS_1_2);

    match &config.trust_anchors {
        TrustAnchors::WebPki => {
            builder = builder.tls_built_in_root_certs(true);
        }
        TrustAnchors::Bundle(path) => {
            debug!("Loading CA bundle from {}", path.display());
            let bundle = std::fs::read(path)?;
            builder = builder.tls_built_in_root_certs(false);
            for cert in parse_pem_certificates(&bundle)? {
                let cert = reqwest::Certificate::from_der(cert.as_ref())
                    .map_err(|e| CepcesError::tls(format!("Failed to parse CA certificate: {}", e)))?;
                builder = builder.add_root_certificate(cert);
            }
        }
        TrustAnchors::Disabled => {
            builder = builder
                .tls_built_in_root_certs(false)
                .danger_accept_invalid_certs(true);
        }
    }

    if let Some(identity) = config.auth.client_identity() {
        builder = builder.identity(build_reqwest_identity(identity)?);
    }

    builder
        .build()
        .map_err(|e| CepcesError::tls(format!("Failed to build HTTP client: {}", e)))
}

/// Build a reqwest Identity from PEM-encoded certificate and key.
fn build_reqwest_identity(identity: &ClientIdentity) -> Result<reqwest::Identity> {
    parse_pem_certificates(&identity.cert_pem)?;
    parse_pem_private_key(&identity.key_pem)?;

    let mut pem_data = identity.cert_pem.clone();
    pem_data.extend_from_slice(b"\n");
    pem_data.extend_from_slice(&identity.key_pem);

    reqwest::Identity::from_pem(&pem_data)
        .map_err(|e| CepcesError::tls(format!("Failed to create client identity: {}", e)))
}

/// Parse PEM-encoded certificates.
pub fn parse_pem_certificates(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::BufReader::new(pem_data);
    let certs: Vec<_> = rustls_pemfile::certs(&mut reader)
        .filter_map(|result| result.ok())
        .collect();

    if certs.is_empty() {
        return Err(CepcesError::invalid_pem("No certificates found in PEM data"));
    }

    Ok(certs)
}

/// Parse a PEM-encoded private key.
pub fn parse_pem_private_key(pem_data: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut reader = std::io::BufReader::new(pem_data);

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(rustls_pemfile::Item::Pkcs8Key(key))) => return Ok(PrivateKeyDer::Pkcs8(key)),
            Ok(Some(rustls_pemfile::Item::Pkcs1Key(key))) => return Ok(PrivateKeyDer::Pkcs1(key)),
            Ok(Some(rustls_pemfile::Item::Sec1Key(key))) => return Ok(PrivateKeyDer::Sec1(key)),
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return Err(CepcesError::invalid_pem(format!("Failed to parse PEM: {}", e)));
            }
        }
    }

    Err(CepcesError::invalid_pem("No private key found in PEM data"))
}
