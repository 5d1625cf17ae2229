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

//! WS-Trust message models used by MS-WSTEP.
//!
//! A request is a `wst:RequestSecurityToken` carrying the PKCS#10 request as
//! a `wsse:BinarySecurityToken`. The server answers with a
//! `wst:RequestSecurityTokenResponseCollection`; each response either holds
//! the issued certificate or a `wsse:SecurityTokenReference` to poll later.

use crate::error::BindingError;
use crate::xml::binding::{self, Field, SELF};
use crate::xml::{ns, Converter, Document, NodeId, QName, XmlNode};

/// X.509v3 token type.
pub const TOKEN_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3";
/// Request type of a new enrollment.
pub const ISSUE_REQUEST_TYPE: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512/Issue";
/// Request type of a status query for a pending enrollment.
pub const QUERY_REQUEST_TYPE: &str =
    "http://schemas.microsoft.com/windows/pki/2009/01/enrollment/QueryTokenStatus";
/// Value type of a PKCS#10 binary security token.
pub const VALUE_TYPE: &str = "http://schemas.microsoft.com/windows/pki/2009/01/enrollment#PKCS10";
/// Encoding type of a base64 binary security token.
pub const ENCODING_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd#base64binary";

const WST: Option<&str> = Some(ns::WST);
const WSSE: Option<&str> = Some(ns::WSSE);
const ENROLLMENT: Option<&str> = Some(ns::ENROLLMENT);

/// `wst:RequestSecurityToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityTokenRequest(NodeId);

impl SecurityTokenRequest {
    const TOKEN_TYPE: Field = Field::value(0, WST, "TokenType", Converter::String).optional();
    const REQUEST_TYPE: Field = Field::value(1, WST, "RequestType", Converter::String);
    const REQUEST_ID: Field = Field::value(2, ENROLLMENT, "RequestID", Converter::UNSIGNED_INT);
    const TOKEN: Field = Field::value(3, WSSE, "BinarySecurityToken", Converter::String);

    /// Requested token type URI.
    pub fn token_type(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::TOKEN_TYPE)
    }

    /// Request type URI (Issue or Query).
    pub fn request_type(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::REQUEST_TYPE)
    }

    /// Set the request type URI.
    pub fn set_request_type(&self, doc: &mut Document, value: &str) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::REQUEST_TYPE, Some(value))
    }

    /// Enrollment request ID, set on Query requests.
    pub fn request_id(&self, doc: &Document) -> Result<Option<u32>, BindingError> {
        binding::get_value(doc, self, &Self::REQUEST_ID)
    }

    /// Set the enrollment request id. The element is created in schema
    /// position when missing.
    pub fn set_request_id(&self, doc: &mut Document, value: u32) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::REQUEST_ID, Some(value))
    }

    /// Base64 body of the PKCS#10 request.
    pub fn token(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::TOKEN)
    }

    /// Set the binary token text.
    pub fn set_token(&self, doc: &mut Document, value: &str) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::TOKEN, Some(value))
    }
}

impl XmlNode for SecurityTokenRequest {
    const FIELDS: &'static [Field] = &[
        Self::TOKEN_TYPE,
        Self::REQUEST_TYPE,
        Self::REQUEST_ID,
        Self::TOKEN,
    ];

    fn create(doc: &mut Document) -> NodeId {
        let request = doc.create_element(QName::ns(ns::WST, "RequestSecurityToken"));
        let token_type = doc.append_element(request, QName::ns(ns::WST, "TokenType"));
        doc.set_text(token_type, Some(TOKEN_TYPE.to_string()));
        let request_type = doc.append_element(request, QName::ns(ns::WST, "RequestType"));
        doc.set_text(request_type, Some(ISSUE_REQUEST_TYPE.to_string()));

        let token = doc.append_element(request, QName::ns(ns::WSSE, "BinarySecurityToken"));
        doc.set_attribute(token, QName::local("ValueType"), VALUE_TYPE);
        doc.set_attribute(token, QName::local("EncodingType"), ENCODING_TYPE);
        doc.set_attribute(token, QName::ns(ns::WSU, "Id"), "");
        request
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// `wsse:Reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference(NodeId);

impl Reference {
    const URI: Field = Field::attribute(0, None, "URI", Converter::String);

    /// Referenced URI.
    pub fn uri(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_attribute(doc, self, &Self::URI)
    }
}

impl XmlNode for Reference {
    const FIELDS: &'static [Field] = &[Self::URI];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::WSSE, "Reference"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// `wsse:SecurityTokenReference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityTokenReference(NodeId);

impl SecurityTokenReference {
    const REFERENCE: Field = Field::element(0, WSSE, "Reference").optional();

    /// `wsse:Reference` pointing at the pending request.
    pub fn reference(&self, doc: &Document) -> Option<Reference> {
        binding::get_element(doc, self, &Self::REFERENCE)
    }
}

impl XmlNode for SecurityTokenReference {
    const FIELDS: &'static [Field] = &[Self::REFERENCE];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::WSSE, "SecurityTokenReference"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// `wst:RequestedSecurityToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedToken(NodeId);

impl RequestedToken {
    const TOKEN: Field = Field::value(0, WSSE, "BinarySecurityToken", Converter::Certificate);
    const TOKEN_REFERENCE: Field =
        Field::element(1, WSSE, "SecurityTokenReference").optional();

    /// Issued certificate as PEM, if the token has content.
    pub fn certificate(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        if !self.has_token(doc) {
            return Ok(None);
        }
        binding::get_value(doc, self, &Self::TOKEN)
    }

    /// Whether a binary token with non-blank content is present.
    pub fn has_token(&self, doc: &Document) -> bool {
        binding::get_node(doc, self, &Self::TOKEN)
            .and_then(|id| doc.text(id))
            .is_some_and(|text| !text.trim().is_empty())
    }

    /// Remove the literal `&#xD;` sequences some servers leave in the
    /// base64 token text.
    pub fn strip_carriage_returns(&self, doc: &mut Document) {
        let Some(id) = binding::get_node(doc, self, &Self::TOKEN) else {
            return;
        };
        let Some(text) = doc.text(id) else {
            return;
        };
        if text.contains("&#xD;") || text.contains('\r') {
            let cleaned = text.replace("&#xD;", "").replace('\r', "");
            doc.set_text(id, Some(cleaned));
        }
    }

    /// Reference to poll for a pending request.
    pub fn token_reference(&self, doc: &Document) -> Option<SecurityTokenReference> {
        binding::get_element(doc, self, &Self::TOKEN_REFERENCE)
    }
}

impl XmlNode for RequestedToken {
    const FIELDS: &'static [Field] = &[Self::TOKEN, Self::TOKEN_REFERENCE];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::WST, "RequestedSecurityToken"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// `wst:RequestSecurityTokenResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityTokenResponse(NodeId);

impl SecurityTokenResponse {
    const TOKEN_TYPE: Field = Field::value(0, WST, "TokenType", Converter::String).optional();
    const DISPOSITION_MESSAGE: Field =
        Field::value(1, ENROLLMENT, "DispositionMessage", Converter::String);
    const TOKEN: Field = Field::value(2, WSSE, "BinarySecurityToken", Converter::String);
    const REQUESTED_TOKEN: Field = Field::element(3, WST, "RequestedSecurityToken");
    const REQUEST_ID: Field = Field::value(4, ENROLLMENT, "RequestID", Converter::UNSIGNED_INT);

    /// Issued token type URI.
    pub fn token_type(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::TOKEN_TYPE)
    }

    /// Server status text such as "Issued" or "Taken Under Submission".
    pub fn disposition_message(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::DISPOSITION_MESSAGE)
    }

    /// Raw top level binary token (the PKCS#7 response on issuance).
    pub fn token(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::TOKEN)
    }

    /// Requested security token, present once issued.
    pub fn requested_token(&self, doc: &Document) -> Option<RequestedToken> {
        binding::get_element(doc, self, &Self::REQUESTED_TOKEN)
    }

    /// Request ID assigned by the CA.
    pub fn request_id(&self, doc: &Document) -> Result<Option<u32>, BindingError> {
        binding::get_value(doc, self, &Self::REQUEST_ID)
    }
}

impl XmlNode for SecurityTokenResponse {
    const FIELDS: &'static [Field] = &[
        Self::TOKEN_TYPE,
        Self::DISPOSITION_MESSAGE,
        Self::TOKEN,
        Self::REQUESTED_TOKEN,
        Self::REQUEST_ID,
    ];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::WST, "RequestSecurityTokenResponse"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// `wst:RequestSecurityTokenResponseCollection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityTokenResponseCollection(NodeId);

impl SecurityTokenResponseCollection {
    const RESPONSES: Field =
        Field::element_list(0, None, SELF, WST, "RequestSecurityTokenResponse");

    /// Bind a received payload, checking its name.
    pub fn from_payload(doc: &Document, payload: NodeId) -> Result<Self, BindingError> {
        if !doc
            .name(payload)
            .is(WST, "RequestSecurityTokenResponseCollection")
        {
            return Err(BindingError::NoSuchElement(
                QName::ns(ns::WST, "RequestSecurityTokenResponseCollection").to_clark(),
            ));
        }
        Self::bind(doc, payload)
    }

    /// Responses in document order.
    pub fn responses(&self, doc: &Document) -> Result<Vec<SecurityTokenResponse>, BindingError> {
        Ok(binding::get_element_list(doc, self, &Self::RESPONSES)?
            .map(|list| list.items(doc))
            .unwrap_or_default())
    }
}

impl XmlNode for SecurityTokenResponseCollection {
    const FIELDS: &'static [Field] = &[Self::RESPONSES];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::WST, "RequestSecurityTokenResponseCollection"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}
