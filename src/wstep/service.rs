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

//! WSTEP enrollment service proxy.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::types::{SecurityTokenRequest, SecurityTokenResponseCollection, QUERY_REQUEST_TYPE};
use crate::error::{BindingError, CepcesError, Result};
use crate::soap::{Envelope, Service};
use crate::xml::{Document, XmlNode};

/// WS-Addressing action of an enrollment request.
pub const ACTION: &str = "http://schemas.microsoft.com/windows/pki/2009/01/enrollment/RST/wstep";

static CSR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^-{5}BEGIN (?:NEW )?CERTIFICATE REQUEST-{5}\n(.*)\n-{5}END (?:NEW )?CERTIFICATE REQUEST-{5}\s*$",
    )
    .expect("CSR regex is valid")
});

/// Outcome of one enrollment response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// The certificate was issued; PEM encoded.
    Issued(String),
    /// The request is pending; poll the given reference.
    Pending(String),
}

/// A curated enrollment response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentResponse {
    /// Server side request id.
    pub request_id: Option<u32>,
    /// Issued certificate or pending reference.
    pub status: TokenStatus,
}

impl EnrollmentResponse {
    /// Issued certificate, if any.
    pub fn token(&self) -> Option<&str> {
        match &self.status {
            TokenStatus::Issued(pem) => Some(pem),
            TokenStatus::Pending(_) => None,
        }
    }

    /// Pending reference, if any.
    pub fn reference(&self) -> Option<&str> {
        match &self.status {
            TokenStatus::Issued(_) => None,
            TokenStatus::Pending(reference) => Some(reference),
        }
    }
}

/// Extract the base64 body of a PEM certificate signing request.
pub fn csr_body(csr: &str) -> Result<&str> {
    CSR_PATTERN
        .captures(csr)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str())
        .ok_or_else(|| CepcesError::lookup("Invalid CSR."))
}

/// Proxy for a WSTEP enrollment endpoint.
#[derive(Debug, Clone)]
pub struct EnrollmentService {
    service: Service,
}

impl EnrollmentService {
    /// Wrap a SOAP service pointing at an enrollment endpoint.
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    /// Underlying SOAP service.
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Request a certificate for a PEM encoded CSR.
    pub async fn request(&self, csr: &str) -> Result<Vec<EnrollmentResponse>> {
        let body = csr_body(csr)?;
        let doc = self.service.message(ACTION, |doc| {
            let request = SecurityTokenRequest::new(doc);
            request.set_token(doc, body)?;
            Ok(request.node())
        })?;
        self.exchange(doc).await
    }

    /// Query the status of a pending request.
    pub async fn poll(&self, request_id: u32) -> Result<Vec<EnrollmentResponse>> {
        debug!("Sending info for previous request {}", request_id);
        let doc = self.service.message(ACTION, |doc| {
            let request = SecurityTokenRequest::new(doc);
            request.set_request_type(doc, QUERY_REQUEST_TYPE)?;
            request.set_request_id(doc, request_id)?;
            Ok(request.node())
        })?;
        self.exchange(doc).await
    }

    async fn exchange(&self, doc: Document) -> Result<Vec<EnrollmentResponse>> {
        let mut response = self.service.send(doc).await?;
        let results = curate(&mut response)?;
        info!(
            "Received {} enrollment response(s) from {}",
            results.len(),
            self.service.endpoint()
        );
        Ok(results)
    }
}

/// Classify every response of a `RequestSecurityTokenResponseCollection`
/// envelope, cleaning token text first.
pub fn curate(doc: &mut Document) -> Result<Vec<EnrollmentResponse>> {
    let envelope = Envelope::from_document(doc)?;
    let payload = envelope
        .payload(doc)
        .ok_or_else(|| BindingError::NoSuchElement("Body payload".to_string()))?;
    let collection = SecurityTokenResponseCollection::from_payload(doc, payload)?;

    let mut results = Vec::new();
    for response in collection.responses(doc)? {
        let request_id = response.request_id(doc)?;
        debug!(
            "Got response (request id: {:?}, disposition: {:?})",
            request_id,
            response.disposition_message(doc)?
        );
        let token = response.requested_token(doc).ok_or_else(|| {
            BindingError::NoSuchElement("RequestedSecurityToken".to_string())
        })?;

        token.strip_carriage_returns(doc);
        let status = match token.certificate(doc)? {
            Some(pem) => TokenStatus::Issued(pem),
            None => {
                let reference = token
                    .token_reference(doc)
                    .and_then(|r| r.reference(doc))
                    .map(|r| r.uri(doc))
                    .transpose()?
                    .flatten()
                    .ok_or_else(|| BindingError::NoSuchElement("Reference@URI".to_string()))?;
                TokenStatus::Pending(reference)
            }
        };
        results.push(EnrollmentResponse { request_id, status });
    }
    Ok(results)
}
