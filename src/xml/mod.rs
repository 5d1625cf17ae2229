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

//! XML support: qualified names, an arena element tree, typed converters and
//! the declarative binding engine used by the SOAP, XCEP and WSTEP models.
//!
//! The pieces build on each other:
//!
//! - [`converter`] turns element text into typed [`Value`]s and back.
//! - [`tree`] holds a [`Document`], an arena of elements addressed by
//!   [`NodeId`], with a parser and a serializer.
//! - [`binding`] maps ordered [`Field`] descriptors onto children of a node,
//!   handling `xsi:nil`, list synchronization and schema ordering.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::BindingError;

pub mod binding;
pub mod converter;
pub mod tree;

pub use binding::{ElementList, Field, FieldKind, ValueList, XmlNode};
pub use converter::{Converter, Offset, Value, XsDateTime};
pub use tree::{Document, NodeId};

/// Namespace URIs used on the wire, with their preferred serialization
/// prefixes.
pub mod ns {
    /// XML Schema instance namespace (carries `nil`).
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    /// SOAP 1.2 envelope namespace.
    pub const SOAP: &str = "http://www.w3.org/2003/05/soap-envelope";
    /// WS-Addressing namespace.
    pub const ADDRESSING: &str = "http://www.w3.org/2005/08/addressing";
    /// WS-Security extension namespace.
    pub const WSSE: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
    /// WS-Security utility namespace.
    pub const WSU: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
    /// MS-XCEP enrollment policy namespace.
    pub const CEP: &str = "http://schemas.microsoft.com/windows/pki/2009/01/enrollmentpolicy";
    /// WS-Trust 1.3 namespace.
    pub const WST: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512";
    /// MS-WSTEP enrollment namespace.
    pub const ENROLLMENT: &str = "http://schemas.microsoft.com/windows/pki/2009/01/enrollment";

    /// Prefixes emitted by the serializer for well-known namespaces.
    pub const PREFIXES: &[(&str, &str)] = &[
        (SOAP, "s"),
        (ADDRESSING, "a"),
        (WSSE, "wsse"),
        (WSU, "wsu"),
        (XSI, "xsi"),
        (CEP, "xcep"),
        (WST, "wst"),
        (ENROLLMENT, "enr"),
    ];
}

/// A namespace-qualified XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    namespace: Option<String>,
    local: String,
}

impl QName {
    /// Create a qualified name.
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// Create a name in the given namespace.
    pub fn ns(namespace: &str, local: impl Into<String>) -> Self {
        Self::new(Some(namespace), local)
    }

    /// Create a name without a namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }

    /// Namespace URI, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local part of the name.
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Compare against a borrowed namespace/local pair.
    pub fn is(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }

    /// Render in Clark notation, `{namespace}local`.
    pub fn to_clark(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{}}}{}", ns, self.local),
            None => self.local.clone(),
        }
    }

    /// Parse Clark notation. The namespace URI is not validated.
    pub fn from_clark(text: &str) -> Result<Self, BindingError> {
        let caps = CLARK
            .captures(text)
            .ok_or_else(|| BindingError::format("Clark notation", text))?;
        Ok(Self::new(
            caps.name("ns").map(|m| m.as_str()),
            caps["name"].to_string(),
        ))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_clark())
    }
}

static CLARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\{(?P<ns>.+)\})?(?P<name>[^{}]+)$").expect("clark regex is valid")
});

/// Qualified name of the `xsi:nil` marker attribute.
pub fn nil_attribute() -> QName {
    QName::ns(ns::XSI, "nil")
}
