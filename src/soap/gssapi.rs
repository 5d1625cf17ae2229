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

//! SPNEGO tokens from the system GSSAPI library.
//!
//! Credentials come from the default credential cache (`KRB5CCNAME`), as
//! left by `kinit`, `kinit -k` or SSSD. Context establishment may contact
//! the KDC, so it runs on the blocking pool.

use async_trait::async_trait;
use libgssapi::context::{ClientCtx, CtxFlags};
use libgssapi::credential::{Cred, CredUsage};
use libgssapi::error::Error as GssError;
use libgssapi::name::Name;
use libgssapi::oid::{OidSet, GSS_MECH_KRB5, GSS_MECH_SPNEGO, GSS_NT_HOSTBASED_SERVICE};
use tracing::debug;
use url::Url;

use super::auth::{service_principal, NegotiateTokenSource};
use crate::error::{CepcesError, Result};

/// Service class of certificate enrollment web services.
pub const HTTP_SERVICE: &str = "HTTP";

/// [`NegotiateTokenSource`] backed by the default Kerberos credentials.
#[derive(Debug, Clone)]
pub struct GssapiTokenSource {
    service: String,
}

impl GssapiTokenSource {
    /// Token source for the `HTTP` service class.
    pub fn new() -> Self {
        Self {
            service: HTTP_SERVICE.to_string(),
        }
    }

    /// Use another service class.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }
}

impl Default for GssapiTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NegotiateTokenSource for GssapiTokenSource {
    async fn token(&self, target: &Url, delegate: bool) -> Result<Vec<u8>> {
        let principal = service_principal(&self.service, target)?;
        debug!("Requesting SPNEGO token for {}", principal);
        tokio::task::spawn_blocking(move || initial_token(&principal, delegate))
            .await
            .map_err(|e| CepcesError::authentication(format!("GSSAPI task failed: {}", e)))?
    }
}

fn gss_error(err: GssError) -> CepcesError {
    CepcesError::authentication(format!("GSSAPI: {}", err))
}

fn initial_token(principal: &str, delegate: bool) -> Result<Vec<u8>> {
    let name = Name::new(principal.as_bytes(), Some(&GSS_NT_HOSTBASED_SERVICE)).map_err(gss_error)?;

    let mut mechs = OidSet::new().map_err(gss_error)?;
    mechs.add(&GSS_MECH_KRB5).map_err(gss_error)?;
    let cred = Cred::acquire(None, None, CredUsage::Initiate, Some(&mechs)).map_err(gss_error)?;

    let mut flags = CtxFlags::GSS_C_MUTUAL_FLAG | CtxFlags::GSS_C_SEQUENCE_FLAG;
    if delegate {
        flags |= CtxFlags::GSS_C_DELEG_FLAG;
    }
    let mut ctx = ClientCtx::new(Some(cred), name, flags, Some(&GSS_MECH_SPNEGO));
    let token = ctx
        .step(None, None)
        .map_err(gss_error)?
        .ok_or_else(|| CepcesError::authentication("GSSAPI returned no initial token"))?;
    Ok(token.to_vec())
}
