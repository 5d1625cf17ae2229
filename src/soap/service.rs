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

//! SOAP endpoint transport.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::auth::Authentication;
use super::types::{Envelope, Fault};
use crate::error::{CepcesError, Result};
use crate::xml::{Document, NodeId, XmlNode};

/// Content type of SOAP 1.2 requests.
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// A SOAP endpoint reached over HTTP.
#[derive(Debug, Clone)]
pub struct Service {
    endpoint: Url,
    client: reqwest::Client,
    auth: Authentication,
}

impl Service {
    /// Create a service for `endpoint` using a prepared HTTP client.
    pub fn new(endpoint: Url, client: reqwest::Client, auth: Authentication) -> Self {
        debug!("Initializing service (endpoint: {}, auth: {:?})", endpoint, auth);
        Self {
            endpoint,
            client,
            auth,
        }
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Authentication used for every exchange.
    pub fn auth(&self) -> &Authentication {
        &self.auth
    }

    /// HTTP client shared with other fetches (AIA).
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Build a request document addressed to this endpoint with `payload`
    /// in the body.
    ///
    /// `payload` is built by the caller inside the returned document.
    pub fn message<F>(&self, action: &str, payload: F) -> Result<Document>
    where
        F: FnOnce(&mut Document) -> Result<NodeId>,
    {
        let mut doc = Document::new();
        let envelope = Envelope::new_document(&mut doc);
        let header = envelope
            .header(&doc)
            .ok_or_else(|| CepcesError::config("envelope skeleton has no header"))?;
        header.set_action(&mut doc, Some(action))?;
        let message_id = format!("urn:uuid:{}", Uuid::new_v4());
        header.set_message_id(&mut doc, Some(message_id.as_str()))?;
        header.set_to(&mut doc, Some(self.endpoint.as_str()))?;

        let payload = payload(&mut doc)?;
        if let Some(body) = envelope.body(&doc) {
            body.set_payload(&mut doc, payload);
        }
        Ok(doc)
    }

    /// Send a request document and return the response document.
    ///
    /// A SOAP fault delivered with status 500 becomes
    /// [`CepcesError::SoapFault`]; any other unsuccessful status is a
    /// transport error.
    pub async fn send(&self, mut doc: Document) -> Result<Document> {
        let envelope = Envelope::from_document(&doc)?;
        debug!("Sending message to {}", self.endpoint);
        debug!(" -data: {}", doc.to_xml());

        self.auth.post_process(&mut doc, envelope)?;
        let data = doc.to_xml();

        let request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(data);
        let response = self.auth.apply(request, &self.endpoint).await?.send().await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("Received {} from {}", status, self.endpoint);
        debug!(" -data: {}", text);

        if status.is_success() {
            return Ok(Document::parse(&text)?);
        }
        if status != StatusCode::INTERNAL_SERVER_ERROR {
            return Err(transport_error(status, text));
        }

        let Ok(doc) = Document::parse(&text) else {
            return Err(transport_error(status, text));
        };
        match fault(&doc) {
            Some(fault) => {
                warn!("Received SOAP fault: {}", fault);
                Err(fault)
            }
            None => Err(transport_error(status, text)),
        }
    }
}

fn transport_error(status: StatusCode, body: String) -> CepcesError {
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("Unknown").to_string()
    } else {
        body
    };
    CepcesError::transport(status.as_u16(), message)
}

/// Extract a SOAP fault from a response document.
pub fn fault(doc: &Document) -> Option<CepcesError> {
    let envelope = Envelope::from_document(doc).ok()?;
    let payload = envelope.payload(doc)?;
    if !Fault::matches(doc, payload) {
        return None;
    }
    let fault = Fault::from_node(payload);
    let code = fault.code(doc);
    Some(CepcesError::SoapFault {
        code: code
            .and_then(|c| c.value(doc).ok().flatten())
            .unwrap_or_default(),
        subcode: code
            .and_then(|c| c.subcode(doc))
            .and_then(|s| s.value(doc).ok().flatten()),
        reason: fault
            .reason(doc)
            .and_then(|r| r.text(doc).ok().flatten())
            .unwrap_or_default(),
    })
}
