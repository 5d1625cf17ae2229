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

//! CA chain reconstruction over Authority Information Access.
//!
//! Starting from one certificate (normally a CA certificate published in the
//! policy response), the resolver follows each certificate's
//! `id-ad-caIssuers` link, fetches the issuer over HTTP, and verifies that
//! the issuer's key signed the certificate below it. The walk ends at a
//! self-signed certificate.
//!
//! The starting certificate is trusted as received; only the links above it
//! are verified. Supported signatures are RSA PKCS#1 v1.5, ECDSA (P-256 and
//! P-384) and DSA, each with SHA-1 or SHA-2 digests.
//!
//! When the walk cannot complete, [`CepcesError::PartialChain`] carries the
//! certificates confirmed so far, leaf first.

use const_oid::db::rfc5280::{ID_AD_CA_ISSUERS, ID_PE_AUTHORITY_INFO_ACCESS};
use const_oid::ObjectIdentifier;
use der::pem::LineEnding;
use der::{Decode, DecodePem, Encode, EncodePem};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;
use spki::DecodePublicKey;
use tracing::{debug, info, warn};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::AuthorityInfoAccessSyntax;
use x509_cert::Certificate;

use crate::error::{CepcesError, Result};

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const ID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");

const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const SHA384_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const SHA512_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
const ECDSA_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const ECDSA_WITH_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");
const DSA_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.3");
const DSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.2");

/// Upper bound on chain length, guarding against AIA loops.
pub const MAX_CHAIN_LENGTH: usize = 10;

/// Digest used by a certificate signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignatureDigest {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl SignatureDigest {
    fn from_algorithm(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            SHA1_WITH_RSA | ECDSA_WITH_SHA1 | DSA_WITH_SHA1 => Ok(Self::Sha1),
            SHA256_WITH_RSA | ECDSA_WITH_SHA256 | DSA_WITH_SHA256 => Ok(Self::Sha256),
            SHA384_WITH_RSA | ECDSA_WITH_SHA384 => Ok(Self::Sha384),
            SHA512_WITH_RSA | ECDSA_WITH_SHA512 => Ok(Self::Sha512),
            other => Err(CepcesError::not_supported(format!(
                "signature algorithm {}",
                other
            ))),
        }
    }

    fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn pkcs1v15(self) -> Pkcs1v15Sign {
        match self {
            Self::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            Self::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            Self::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            Self::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

fn invalid_signature(err: impl std::fmt::Display) -> CepcesError {
    CepcesError::InvalidSignature(err.to_string())
}

/// Parse a certificate, trying PEM first and DER second.
pub fn parse_certificate(data: &[u8]) -> Result<Certificate> {
    Certificate::from_pem(data)
        .or_else(|_| Certificate::from_der(data))
        .map_err(|e| CepcesError::certificate_parsing(e.to_string()))
}

/// Encode a certificate as PEM.
pub fn certificate_to_pem(cert: &Certificate) -> Result<String> {
    Ok(cert.to_pem(LineEnding::LF)?)
}

/// Common name of the certificate subject.
pub fn subject_common_name(cert: &Certificate) -> Option<String> {
    use const_oid::db::rfc4519::CN;

    cert.tbs_certificate
        .subject
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == CN)
        .and_then(|atv| std::str::from_utf8(atv.value.value()).ok())
        .map(str::to_string)
}

/// Whether subject and issuer are the same name.
pub fn is_self_issued(cert: &Certificate) -> bool {
    cert.tbs_certificate.subject == cert.tbs_certificate.issuer
}

/// URIs of the `id-ad-caIssuers` access descriptions, or `None` when the
/// certificate has no AIA extension.
pub fn ca_issuer_urls(cert: &Certificate) -> Result<Option<Vec<String>>> {
    let Some(extension) = cert
        .tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|ext| ext.extn_id == ID_PE_AUTHORITY_INFO_ACCESS)
    else {
        return Ok(None);
    };

    let aia = AuthorityInfoAccessSyntax::from_der(extension.extn_value.as_bytes())?;
    let urls = aia
        .0
        .iter()
        .filter(|access| access.access_method == ID_AD_CA_ISSUERS)
        .filter_map(|access| match &access.access_location {
            GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
            _ => None,
        })
        .collect();
    Ok(Some(urls))
}

/// Verify that `issuer`'s public key produced `cert`'s signature.
pub fn verify_signature(cert: &Certificate, issuer: &Certificate) -> Result<()> {
    let digest = SignatureDigest::from_algorithm(&cert.signature_algorithm.oid)?;
    let hashed = digest.hash(&cert.tbs_certificate.to_der()?);
    let signature = cert
        .signature
        .as_bytes()
        .ok_or_else(|| invalid_signature("signature is not octet aligned"))?;

    let spki = &issuer.tbs_certificate.subject_public_key_info;
    let key = spki.to_der()?;
    match spki.algorithm.oid {
        RSA_ENCRYPTION => {
            let key = RsaPublicKey::from_public_key_der(&key).map_err(invalid_signature)?;
            key.verify(digest.pkcs1v15(), &hashed, signature)
                .map_err(invalid_signature)
        }
        ID_EC_PUBLIC_KEY => verify_ecdsa(&key, &hashed, signature),
        ID_DSA => {
            let key = dsa::VerifyingKey::from_public_key_der(&key).map_err(invalid_signature)?;
            let signature = dsa::Signature::from_der(signature).map_err(invalid_signature)?;
            key.verify_prehash(&hashed, &signature)
                .map_err(invalid_signature)
        }
        other => Err(CepcesError::not_supported(format!("public key type {}", other))),
    }
}

fn verify_ecdsa(key: &[u8], prehash: &[u8], signature: &[u8]) -> Result<()> {
    if let Ok(key) = p256::ecdsa::VerifyingKey::from_public_key_der(key) {
        let signature = p256::ecdsa::Signature::from_der(signature).map_err(invalid_signature)?;
        return key
            .verify_prehash(prehash, &signature)
            .map_err(invalid_signature);
    }
    if let Ok(key) = p384::ecdsa::VerifyingKey::from_public_key_der(key) {
        let signature = p384::ecdsa::Signature::from_der(signature).map_err(invalid_signature)?;
        return key
            .verify_prehash(prehash, &signature)
            .map_err(invalid_signature);
    }
    Err(CepcesError::not_supported("elliptic curve"))
}

/// Walks AIA links to build a CA chain.
#[derive(Debug, Clone)]
pub struct ChainResolver {
    client: reqwest::Client,
}

impl ChainResolver {
    /// Create a resolver fetching issuers with `client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Resolve the chain above `data` (PEM or DER), returned root first.
    pub async fn resolve(&self, data: &[u8]) -> Result<Vec<Certificate>> {
        let mut chain = vec![parse_certificate(data)?];

        loop {
            let Some(current) = chain.last() else {
                break;
            };
            if is_self_issued(current) {
                break;
            }
            if chain.len() >= MAX_CHAIN_LENGTH {
                return Err(CepcesError::partial_chain(
                    format!("chain longer than {} certificates", MAX_CHAIN_LENGTH),
                    chain,
                ));
            }

            let urls = match ca_issuer_urls(current) {
                Ok(Some(urls)) if !urls.is_empty() => urls,
                Ok(_) => return Err(CepcesError::partial_chain("Missing AIA", chain)),
                Err(e) => return Err(CepcesError::partial_chain(e.to_string(), chain)),
            };

            let issuer = match self.fetch_issuer(&urls).await {
                Ok(issuer) => issuer,
                Err(e) => return Err(CepcesError::partial_chain(e.to_string(), chain)),
            };

            if let Err(e) = verify_signature(current, &issuer) {
                warn!(
                    "Could not verify certificate chain ({:?} not signed by {:?})",
                    subject_common_name(current),
                    subject_common_name(&issuer)
                );
                // The certificate whose signature failed is not part of the
                // confirmed chain, unless it is the trusted starting point.
                if chain.len() > 1 {
                    chain.pop();
                }
                return Err(CepcesError::partial_chain(e.to_string(), chain));
            }

            debug!("Verified link to {:?}", subject_common_name(&issuer));
            chain.push(issuer);
        }

        info!("Resolved certificate chain of length {}", chain.len());
        chain.reverse();
        Ok(chain)
    }

    async fn fetch_issuer(&self, urls: &[String]) -> Result<Certificate> {
        let mut last_error = None;
        for url in urls {
            debug!("Fetching issuer certificate from {}", url);
            match self.fetch(url).await {
                Ok(cert) => return Ok(cert),
                Err(e) => {
                    warn!("Failed to fetch issuer from {}: {}", url, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CepcesError::lookup("no CA issuer URL")))
    }

    async fn fetch(&self, url: &str) -> Result<Certificate> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        parse_certificate(&body)
    }
}
