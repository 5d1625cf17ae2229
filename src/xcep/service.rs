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

//! XCEP policy service proxy and policy resolution.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};
use url::Url;

use super::types::{CertificateAuthority, GetPolicies, GetPoliciesResponse, Policy};
use crate::error::{BindingError, CepcesError, Result};
use crate::soap::{AuthMethod, Envelope, Service};
use crate::xml::{Document, XmlNode};

/// WS-Addressing action of a `GetPolicies` request.
pub const ACTION: &str =
    "http://schemas.microsoft.com/windows/pki/2009/01/enrollmentpolicy/IPolicy/GetPolicies";

/// An enrollment endpoint advertised by a CA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Enrollment service URL.
    pub url: Url,
    /// Priority, lower is preferred. `None` when the server sent nil.
    pub priority: Option<u32>,
    /// Whether the endpoint only accepts renewals.
    pub renewal_only: bool,
    /// Authentication method the endpoint expects.
    pub auth_method: AuthMethod,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Sort endpoints ascending by priority. Ties keep response order and
/// endpoints without a priority go last.
pub fn sort_endpoints(endpoints: &mut [Endpoint]) {
    endpoints.sort_by_key(|e| (e.priority.is_none(), e.priority));
}

/// A parsed `GetPoliciesResponse` together with the document holding it.
#[derive(Debug)]
pub struct PolicyResponse {
    doc: Document,
    message: GetPoliciesResponse,
}

impl PolicyResponse {
    /// Bind the body of a response envelope.
    pub fn from_document(doc: Document) -> Result<Self> {
        let envelope = Envelope::from_document(&doc)?;
        let payload = envelope
            .payload(&doc)
            .ok_or_else(|| BindingError::NoSuchElement("Body payload".to_string()))?;
        let message = GetPoliciesResponse::from_payload(&doc, payload)?;
        Ok(Self { doc, message })
    }

    /// Document backing the response.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Bound response message.
    pub fn message(&self) -> GetPoliciesResponse {
        self.message
    }

    /// Issuing CAs; `None` when the server sent nil.
    pub fn cas(&self) -> Result<Option<Vec<CertificateAuthority>>> {
        Ok(self.message.cas(&self.doc)?)
    }

    /// Common names of all policies; `None` when the policy list is nil.
    pub fn templates(&self) -> Result<Option<Vec<String>>> {
        let Some(policies) = self.message.policies(&self.doc)? else {
            return Ok(None);
        };
        let mut names = Vec::with_capacity(policies.len());
        for policy in policies {
            if let Some(name) = policy.common_name(&self.doc)? {
                names.push(name);
            }
        }
        Ok(Some(names))
    }

    /// Every endpoint accepting `method`, sorted by priority.
    ///
    /// `None` when the CA list is nil.
    pub fn endpoints(&self, method: AuthMethod) -> Result<Option<Vec<Endpoint>>> {
        let Some(cas) = self.cas()? else {
            return Ok(None);
        };
        let mut endpoints = Vec::new();
        for ca in cas {
            self.collect_endpoints(ca, method, &mut endpoints)?;
        }
        sort_endpoints(&mut endpoints);
        Ok(Some(endpoints))
    }

    /// Endpoints of the CAs issuing `template` that accept `method`, sorted
    /// by priority.
    pub fn resolve(&self, template: &str, method: AuthMethod) -> Result<Vec<Endpoint>> {
        let policy = self
            .find_policy(template)?
            .ok_or_else(|| CepcesError::lookup("No such certificate profile."))?;

        let references: HashSet<i64> = policy
            .ca_references(&self.doc)?
            .unwrap_or_default()
            .into_iter()
            .collect();
        if references.is_empty() {
            return Err(CepcesError::lookup("No CAs issuing the profile."));
        }

        let mut endpoints = Vec::new();
        for ca in self.cas()?.unwrap_or_default() {
            let Some(id) = ca.reference_id(&self.doc)? else {
                continue;
            };
            if references.contains(&i64::from(id)) {
                self.collect_endpoints(ca, method, &mut endpoints)?;
            }
        }
        if endpoints.is_empty() {
            return Err(CepcesError::lookup(format!(
                "No {} endpoints issuing the profile.",
                method
            )));
        }
        sort_endpoints(&mut endpoints);
        debug!("Resolved {} to {} endpoint(s)", template, endpoints.len());
        Ok(endpoints)
    }

    fn find_policy(&self, template: &str) -> Result<Option<Policy>> {
        for policy in self.message.policies(&self.doc)?.unwrap_or_default() {
            if policy.common_name(&self.doc)?.as_deref() == Some(template) {
                return Ok(Some(policy));
            }
        }
        Ok(None)
    }

    fn collect_endpoints(
        &self,
        ca: CertificateAuthority,
        method: AuthMethod,
        out: &mut Vec<Endpoint>,
    ) -> Result<()> {
        for uri in ca.uris(&self.doc)? {
            if uri.client_authentication(&self.doc)? != Some(method) {
                continue;
            }
            let Some(address) = uri.uri(&self.doc)? else {
                continue;
            };
            let url = match Url::parse(address.trim()) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping malformed endpoint URI {:?}: {}", address, e);
                    continue;
                }
            };
            out.push(Endpoint {
                url,
                priority: uri.priority(&self.doc)?,
                renewal_only: uri.renewal_only(&self.doc)?.unwrap_or(false),
                auth_method: method,
            });
        }
        Ok(())
    }
}

/// Proxy for an XCEP policy endpoint.
#[derive(Debug, Clone)]
pub struct PolicyService {
    service: Service,
}

impl PolicyService {
    /// Wrap a SOAP service pointing at a policy endpoint.
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    /// Underlying SOAP service.
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Fetch the available policies.
    pub async fn get_policies(&self) -> Result<PolicyResponse> {
        let doc = self.service.message(ACTION, |doc| Ok(GetPolicies::new(doc).node()))?;
        let response = PolicyResponse::from_document(self.service.send(doc).await?)?;
        info!(
            "Fetched policies from {} ({} CA(s))",
            self.service.endpoint(),
            response.cas()?.map_or(0, |cas| cas.len())
        );
        Ok(response)
    }

    /// Fetch policies and resolve `template` for `method`.
    pub async fn resolve(&self, template: &str, method: AuthMethod) -> Result<Vec<Endpoint>> {
        self.get_policies().await?.resolve(template, method)
    }
}
