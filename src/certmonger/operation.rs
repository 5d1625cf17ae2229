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

//! certmonger operations.

use std::fmt;
use std::io::Write;

use tracing::{debug, error, warn};

use super::cookie::Cookie;
use super::environment::{self, Environment};
use super::ResultCode;
use crate::chain::{certificate_to_pem, subject_common_name};
use crate::client::{CertificateService, EnrollmentResult, EnrollmentStatus};
use crate::error::{CepcesError, Result};

/// Operations certmonger may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Enroll a new certificate.
    Submit,
    /// Poll a pending request.
    Poll,
    /// Print helper version.
    Identify,
    /// List variables needed for a new request.
    GetNewRequestRequirements,
    /// List variables needed for a renewal.
    GetRenewRequestRequirements,
    /// List the available templates.
    GetSupportedTemplates,
    /// Print the default template.
    GetDefaultTemplate,
    /// Print the CA chain.
    FetchRoots,
}

impl Operation {
    /// Every supported operation.
    pub const ALL: [Operation; 8] = [
        Self::Submit,
        Self::Poll,
        Self::Identify,
        Self::GetNewRequestRequirements,
        Self::GetRenewRequestRequirements,
        Self::GetSupportedTemplates,
        Self::GetDefaultTemplate,
        Self::FetchRoots,
    ];

    /// Parse a `CERTMONGER_OPERATION` value.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// certmonger's name for the operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::Submit => "SUBMIT",
            Self::Poll => "POLL",
            Self::Identify => "IDENTIFY",
            Self::GetNewRequestRequirements => "GET-NEW-REQUEST-REQUIREMENTS",
            Self::GetRenewRequestRequirements => "GET-RENEW-REQUEST-REQUIREMENTS",
            Self::GetSupportedTemplates => "GET-SUPPORTED-TEMPLATES",
            Self::GetDefaultTemplate => "GET-DEFAULT-TEMPLATE",
            Self::FetchRoots => "FETCH-ROOTS",
        }
    }

    /// Whether the operation talks to the server.
    pub fn needs_service(self) -> bool {
        !matches!(
            self,
            Self::Identify
                | Self::GetNewRequestRequirements
                | Self::GetRenewRequestRequirements
                | Self::GetDefaultTemplate
        )
    }

    /// Environment variables that must be set.
    pub fn required(self) -> &'static [&'static str] {
        match self {
            Self::Submit => &[environment::CSR],
            Self::Poll => &[environment::CA_COOKIE],
            _ => &[],
        }
    }

    /// Fail with `MissingEnvironmentVariable` unless every required
    /// variable is present.
    pub fn check(self, env: &Environment) -> Result<()> {
        for name in self.required() {
            env.require(name)?;
        }
        Ok(())
    }

    /// Run the operation, writing certmonger's output to `out`.
    ///
    /// `service` is `None` when no connection could be made; SUBMIT and POLL
    /// then report `Underconfigured` while the listing operations print
    /// nothing.
    pub async fn execute<W: Write + Send>(
        self,
        env: &Environment,
        service: Option<&dyn CertificateService>,
        out: &mut W,
    ) -> Result<ResultCode> {
        debug!("Running {}", self);
        match self {
            Self::Submit => match service {
                Some(service) => submit(env, service, out).await,
                None => Ok(ResultCode::Underconfigured),
            },
            Self::Poll => match service {
                Some(service) => poll(env, service, out).await,
                None => Ok(ResultCode::Underconfigured),
            },
            Self::Identify => {
                writeln!(out, "usg-cepces {}", crate::VERSION)?;
                Ok(ResultCode::DEFAULT)
            }
            Self::GetNewRequestRequirements | Self::GetRenewRequestRequirements => {
                writeln!(out, "{}", environment::CA_PROFILE)?;
                Ok(ResultCode::DEFAULT)
            }
            Self::GetDefaultTemplate => Ok(ResultCode::DEFAULT),
            Self::GetSupportedTemplates => {
                if let Some(service) = service {
                    for template in service.templates()?.unwrap_or_default() {
                        writeln!(out, "{}", template)?;
                    }
                }
                Ok(ResultCode::DEFAULT)
            }
            Self::FetchRoots => match service {
                Some(service) => fetch_roots(service, out).await,
                None => Ok(ResultCode::DEFAULT),
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a failed submit or poll onto a result code.
///
/// Faults and unexpected errors print their message for certmonger to
/// record.
pub fn failure<W: Write>(err: &CepcesError, out: &mut W) -> Result<ResultCode> {
    match err {
        CepcesError::SoapFault { .. } => {
            warn!("Request rejected: {}", err);
            writeln!(out, "{}", err)?;
            Ok(ResultCode::Rejected)
        }
        err if err.is_transport() => {
            error!("Could not reach the CA: {}", err);
            Ok(ResultCode::ConnectError)
        }
        CepcesError::Lookup(_)
        | CepcesError::Authentication(_)
        | CepcesError::Config(_)
        | CepcesError::MissingEnvironmentVariable(_) => {
            error!("{}", err);
            Ok(ResultCode::Underconfigured)
        }
        err => {
            error!("Request failed: {}", err);
            writeln!(out, "{}", err)?;
            Ok(ResultCode::Rejected)
        }
    }
}

async fn submit<W: Write + Send>(
    env: &Environment,
    service: &dyn CertificateService,
    out: &mut W,
) -> Result<ResultCode> {
    let csr = env.require(environment::CSR)?.trim();
    let renew = env.get(environment::CERTIFICATE).is_some();
    let profile = env
        .get(environment::CA_PROFILE)
        .map(str::trim)
        .filter(|profile| !profile.is_empty());

    let result = match service.request(csr, renew, profile).await {
        Ok(result) => result,
        Err(err) => return failure(&err, out),
    };
    let Some(result) = result else {
        error!(
            "No result received. This may indicate no enrollment endpoints are available \
             (check CA configuration)."
        );
        return Ok(ResultCode::Underconfigured);
    };
    report(result, service.poll_interval(), out)
}

async fn poll<W: Write + Send>(
    env: &Environment,
    service: &dyn CertificateService,
    out: &mut W,
) -> Result<ResultCode> {
    let cookie: Cookie = match env.require(environment::CA_COOKIE)?.parse() {
        Ok(cookie) => cookie,
        Err(err) => return failure(&err, out),
    };

    let result = match service.poll(cookie.request_id, &cookie.reference).await {
        Ok(result) => result,
        Err(err) => return failure(&err, out),
    };
    let Some(result) = result else {
        error!("No result received from poll");
        return Ok(ResultCode::Underconfigured);
    };
    report(result, service.poll_interval(), out)
}

fn report<W: Write>(result: EnrollmentResult, poll_interval: u64, out: &mut W) -> Result<ResultCode> {
    match result.status {
        EnrollmentStatus::Issued(certificate) => {
            writeln!(out, "{}", certificate_to_pem(&certificate)?.trim())?;
            Ok(ResultCode::Issued)
        }
        EnrollmentStatus::Pending(reference) => {
            let Some(request_id) = result.request_id else {
                writeln!(out, "Pending request carries no request ID.")?;
                return Ok(ResultCode::Rejected);
            };
            writeln!(out, "{}", Cookie::new(poll_interval, request_id, reference))?;
            Ok(ResultCode::WaitMore)
        }
    }
}

async fn fetch_roots<W: Write + Send>(
    service: &dyn CertificateService,
    out: &mut W,
) -> Result<ResultCode> {
    let chain = match service.certificate_chain(0).await {
        Ok(chain) => chain.unwrap_or_default(),
        Err(CepcesError::PartialChain { message, mut chain }) => {
            warn!("Using partial certificate chain: {}", message);
            chain.reverse();
            chain
        }
        Err(err) => return Err(err),
    };

    let mut entries = Vec::with_capacity(chain.len());
    for cert in &chain {
        let name = subject_common_name(cert)
            .unwrap_or_else(|| cert.tbs_certificate.subject.to_string());
        entries.push(format!("{}\n{}", name, certificate_to_pem(cert)?.trim()));
    }
    writeln!(out, "{}", entries.join("\n"))?;
    Ok(ResultCode::DEFAULT)
}
