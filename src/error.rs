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

//! Error types for the enrollment client.
//!
//! [`CepcesError`] is the crate-wide error. Failures inside the XML binding
//! engine and the converter library are reported as [`BindingError`] and
//! converted on the way out.

use thiserror::Error;
use x509_cert::Certificate;

/// Result type alias using [`CepcesError`].
pub type Result<T> = std::result::Result<T, CepcesError>;

/// Errors raised by converters and the XML binding engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// A value of the wrong domain type was supplied.
    #[error("type error: expected {expected}, got {actual}")]
    Type {
        /// Expected value kind.
        expected: &'static str,
        /// Supplied value kind.
        actual: &'static str,
    },

    /// An integer fell outside the converter's bounds.
    #[error("value {value} out of range [{lower}, {upper}]")]
    Range {
        /// Offending value.
        value: i128,
        /// Inclusive lower bound.
        lower: i64,
        /// Inclusive upper bound.
        upper: i64,
    },

    /// Text could not be decoded by a converter.
    #[error("invalid {kind} text: {text:?}")]
    Format {
        /// Converter or notation name.
        kind: &'static str,
        /// The offending text.
        text: String,
    },

    /// `None` was assigned to a field that is not nillable.
    #[error("field {0} is not nillable")]
    NotNillable(String),

    /// A required field was deleted.
    #[error("field {0} is required and cannot be deleted")]
    Required(String),

    /// A required element is missing from the tree.
    #[error("element {0} is missing")]
    NoSuchElement(String),

    /// List index outside the current list length.
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current length.
        len: usize,
    },

    /// A node id does not refer to an element of this document.
    #[error("node {0} is not an element of this document")]
    NotAnElement(usize),
}

impl BindingError {
    /// Create a format error for the given converter kind.
    pub fn format(kind: &'static str, text: impl Into<String>) -> Self {
        Self::Format {
            kind,
            text: text.into(),
        }
    }
}

/// Errors that can occur while talking to XCEP/WSTEP endpoints.
#[derive(Debug, Error)]
pub enum CepcesError {
    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// HTTP request error (connection failure, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status that did not carry a SOAP fault.
    #[error("Transport error {status}: {message}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// SOAP fault returned by the service.
    #[error("{reason} (Code: {code}; Subcode: {})", .subcode.as_deref().unwrap_or("None"))]
    SoapFault {
        /// Fault code value.
        code: String,
        /// Optional fault subcode value.
        subcode: Option<String>,
        /// Human readable reason.
        reason: String,
    },

    /// Malformed XML document.
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Binding or conversion failure.
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// A lookup (template, CSR body, endpoint) failed.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// The certificate chain could only be partially resolved.
    ///
    /// `chain` holds the certificates validated so far, leaf first.
    #[error("Partial certificate chain: {message}")]
    PartialChain {
        /// Why the walk stopped.
        message: String,
        /// Certificates resolved before the failure.
        chain: Vec<Certificate>,
    },

    /// A certificate signature did not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Failed to parse an X.509 certificate.
    #[error("Certificate parsing error: {0}")]
    CertificateParsing(String),

    /// Invalid PEM data.
    #[error("Invalid PEM data: {0}")]
    InvalidPem(String),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// DER encoding/decoding error.
    #[error("DER error: {0}")]
    Der(#[from] der::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Credentials for the configured authentication method are unavailable.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A mandatory environment variable is not set.
    #[error("The mandatory environment variable {0} is missing, cannot proceed.")]
    MissingEnvironmentVariable(String),

    /// Operation not supported.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CepcesError {
    /// Create a TLS error with the given message.
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create a transport error with status and message.
    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Create a lookup error with the given message.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a partial chain error.
    pub fn partial_chain(message: impl Into<String>, chain: Vec<Certificate>) -> Self {
        Self::PartialChain {
            message: message.into(),
            chain,
        }
    }

    /// Create a certificate parsing error with the given message.
    pub fn certificate_parsing(msg: impl Into<String>) -> Self {
        Self::CertificateParsing(msg.into())
    }

    /// Create an invalid PEM error.
    pub fn invalid_pem(msg: impl Into<String>) -> Self {
        Self::InvalidPem(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a not supported error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported(operation.into())
    }

    /// Returns true if the error stems from the network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Transport { .. } | Self::Tls(_))
    }

    /// Returns the partially resolved chain, if this is a partial chain error.
    pub fn partial_result(&self) -> Option<&[Certificate]> {
        match self {
            Self::PartialChain { chain, .. } => Some(chain),
            _ => None,
        }
    }
}
