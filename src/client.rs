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

//! Enrollment client composing the policy and enrollment services.

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;
use x509_cert::Certificate;

use crate::chain::{parse_certificate, ChainResolver};
use crate::config::{Configuration, EndpointType};
use crate::error::Result;
use crate::soap::Service;
use crate::tls::build_http_client;
use crate::wstep::{EnrollmentResponse, EnrollmentService, TokenStatus};
use crate::xcep::{Endpoint, PolicyResponse, PolicyService};

/// Outcome of an enrollment request or poll.
#[derive(Debug, Clone)]
pub enum EnrollmentStatus {
    /// The certificate was issued.
    Issued(Box<Certificate>),

    /// The request is pending at the given reference.
    Pending(String),
}

/// First result returned by an enrollment endpoint.
#[derive(Debug, Clone)]
pub struct EnrollmentResult {
    /// Server side request ID, needed to poll a pending request.
    pub request_id: Option<u32>,

    /// Issued certificate or pending reference.
    pub status: EnrollmentStatus,
}

impl EnrollmentResult {
    /// Create an issued result.
    pub fn issued(request_id: Option<u32>, certificate: Certificate) -> Self {
        Self {
            request_id,
            status: EnrollmentStatus::Issued(Box::new(certificate)),
        }
    }

    /// Create a pending result.
    pub fn pending(request_id: Option<u32>, reference: impl Into<String>) -> Self {
        Self {
            request_id,
            status: EnrollmentStatus::Pending(reference.into()),
        }
    }

    /// Returns the issued certificate, if any.
    pub fn certificate(&self) -> Option<&Certificate> {
        match &self.status {
            EnrollmentStatus::Issued(certificate) => Some(certificate),
            EnrollmentStatus::Pending(_) => None,
        }
    }

    /// Returns the pending reference, if any.
    pub fn reference(&self) -> Option<&str> {
        match &self.status {
            EnrollmentStatus::Issued(_) => None,
            EnrollmentStatus::Pending(reference) => Some(reference),
        }
    }

    /// Returns true if the request is pending.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, EnrollmentStatus::Pending(_))
    }

    fn from_response(response: EnrollmentResponse) -> Result<Self> {
        match response.status {
            TokenStatus::Issued(pem) => Ok(Self::issued(
                response.request_id,
                parse_certificate(pem.as_bytes())?,
            )),
            TokenStatus::Pending(reference) => Ok(Self::pending(response.request_id, reference)),
        }
    }
}

/// The operations the certmonger adapter drives.
#[async_trait]
pub trait CertificateService: Send + Sync {
    /// Seconds the caller should wait before polling a pending request.
    fn poll_interval(&self) -> u64;

    /// Common names of the available templates.
    fn templates(&self) -> Result<Option<Vec<String>>>;

    /// Submit a PEM encoded CSR.
    ///
    /// `None` when no usable endpoint exists or the server returned nothing.
    async fn request(
        &self,
        csr: &str,
        renew: bool,
        profile: Option<&str>,
    ) -> Result<Option<EnrollmentResult>>;

    /// Poll a pending request at `reference`.
    async fn poll(&self, request_id: u32, reference: &str) -> Result<Option<EnrollmentResult>>;

    /// CA chain of the `index`-th CA, root first.
    async fn certificate_chain(&self, index: usize) -> Result<Option<Vec<Certificate>>>;
}

enum Connection {
    Policy {
        service: PolicyService,
        policies: PolicyResponse,
    },
    Enrollment(EnrollmentService),
}

/// XCEP/WSTEP enrollment client.
///
/// # Example
///
/// ```no_run
/// use usg_cepces::{CepcesClient, Configuration};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Configuration::builder()
///     .endpoint("https://cep.example.com/ADPolicyProvider_CEP_Kerberos/service.svc/CEP")?
///     .build()?;
///
/// let client = CepcesClient::new(config).await?;
/// for template in client.templates()?.unwrap_or_default() {
///     println!("{}", template);
/// }
/// # Ok(())
/// # }
/// ```
pub struct CepcesClient {
    config: Configuration,
    http: reqwest::Client,
    connection: Connection,
}

impl CepcesClient {
    /// Create a client; policy endpoints are queried immediately.
    pub async fn new(config: Configuration) -> Result<Self> {
        let http = build_http_client(&config)?;
        let service = Service::new(config.endpoint.clone(), http.clone(), config.auth.clone());

        let connection = match config.endpoint_type {
            EndpointType::Policy => {
                let service = PolicyService::new(service);
                let policies = service.get_policies().await?;
                Connection::Policy { service, policies }
            }
            EndpointType::Enrollment => Connection::Enrollment(EnrollmentService::new(service)),
        };

        Ok(Self {
            config,
            http,
            connection,
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Policy response fetched at construction, for policy endpoints.
    pub fn policies(&self) -> Option<&PolicyResponse> {
        match &self.connection {
            Connection::Policy { policies, .. } => Some(policies),
            Connection::Enrollment(_) => None,
        }
    }

    /// Policy service proxy, for policy endpoints.
    pub fn policy_service(&self) -> Option<&PolicyService> {
        match &self.connection {
            Connection::Policy { service, .. } => Some(service),
            Connection::Enrollment(_) => None,
        }
    }

    /// Enrollment endpoints accepting the configured authentication, by
    /// ascending priority.
    pub fn endpoints(&self) -> Result<Option<Vec<Endpoint>>> {
        match self.policies() {
            Some(policies) => policies.endpoints(self.config.auth.method()),
            None => Ok(None),
        }
    }

    /// Common names of the available templates.
    pub fn templates(&self) -> Result<Option<Vec<String>>> {
        match self.policies() {
            Some(policies) => policies.templates(),
            None => Ok(None),
        }
    }

    /// Resolve the CA chain of the `index`-th CA, root first.
    pub async fn certificate_chain(&self, index: usize) -> Result<Option<Vec<Certificate>>> {
        let Some(policies) = self.policies() else {
            return Ok(None);
        };
        let Some(cas) = policies.cas()? else {
            return Ok(None);
        };
        let Some(ca) = cas.get(index) else {
            return Ok(None);
        };
        let Some(pem) = ca.certificate(policies.document())? else {
            return Ok(None);
        };

        let chain = ChainResolver::new(self.http.clone())
            .resolve(pem.as_bytes())
            .await?;
        Ok(Some(chain))
    }

    /// Submit a PEM encoded CSR.
    ///
    /// For policy endpoints the first endpoint by priority is used, skipping
    /// renewal-only endpoints unless `renew` is set. With a `profile`, only
    /// endpoints of CAs issuing that template are candidates.
    pub async fn request(
        &self,
        csr: &str,
        renew: bool,
        profile: Option<&str>,
    ) -> Result<Option<EnrollmentResult>> {
        let service = match &self.connection {
            Connection::Enrollment(service) => service.clone(),
            Connection::Policy { policies, .. } => {
                let candidates = match profile {
                    Some(template) => policies.resolve(template, self.config.auth.method())?,
                    None => match policies.endpoints(self.config.auth.method())? {
                        Some(endpoints) => endpoints,
                        None => return Ok(None),
                    },
                };
                let Some(endpoint) = candidates
                    .into_iter()
                    .find(|endpoint| renew || !endpoint.renewal_only)
                else {
                    warn!("No usable enrollment endpoint (renewal: {})", renew);
                    return Ok(None);
                };
                info!("Using enrollment endpoint {}", endpoint);
                self.enrollment_service(endpoint.url)
            }
        };

        debug!("Sending CSR: {}", csr);
        first_result(service.request(csr).await?)
    }

    /// Poll a pending request against its reference endpoint.
    pub async fn poll(&self, request_id: u32, reference: &str) -> Result<Option<EnrollmentResult>> {
        let service = self.enrollment_service(Url::parse(reference)?);
        first_result(service.poll(request_id).await?)
    }

    fn enrollment_service(&self, endpoint: Url) -> EnrollmentService {
        EnrollmentService::new(Service::new(
            endpoint,
            self.http.clone(),
            self.config.auth.clone(),
        ))
    }
}

fn first_result(responses: Vec<EnrollmentResponse>) -> Result<Option<EnrollmentResult>> {
    responses
        .into_iter()
        .next()
        .map(EnrollmentResult::from_response)
        .transpose()
}

#[async_trait]
impl CertificateService for CepcesClient {
    fn poll_interval(&self) -> u64 {
        self.config.poll_interval
    }

    fn templates(&self) -> Result<Option<Vec<String>>> {
        CepcesClient::templates(self)
    }

    async fn request(
        &self,
        csr: &str,
        renew: bool,
        profile: Option<&str>,
    ) -> Result<Option<EnrollmentResult>> {
        CepcesClient::request(self, csr, renew, profile).await
    }

    async fn poll(&self, request_id: u32, reference: &str) -> Result<Option<EnrollmentResult>> {
        CepcesClient::poll(self, request_id, reference).await
    }

    async fn certificate_chain(&self, index: usize) -> Result<Option<Vec<Certificate>>> {
        CepcesClient::certificate_chain(self, index).await
    }
}
