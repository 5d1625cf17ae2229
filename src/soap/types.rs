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

//! SOAP 1.2 envelope, addressing header, WS-Security and fault models.

use crate::error::BindingError;
use crate::xml::binding::{self, Field};
use crate::xml::{nil_attribute, ns, Converter, Document, NodeId, QName, XmlNode, XsDateTime};

/// `Type` attribute value marking a plain text password.
pub const PASSWORD_TEXT: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

fn must_understand() -> QName {
    QName::ns(ns::SOAP, "mustUnderstand")
}

/// Fault subcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultSubcode(NodeId);

impl FaultSubcode {
    const VALUE: Field = Field::value(0, Some(ns::SOAP), "Value", Converter::String);

    /// Subcode value, such as `a:InternalServiceFault`.
    pub fn value(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::VALUE)
    }

    /// Set the subcode value.
    pub fn set_value(&self, doc: &mut Document, value: &str) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::VALUE, Some(value))
    }
}

impl XmlNode for FaultSubcode {
    const FIELDS: &'static [Field] = &[Self::VALUE];

    fn create(doc: &mut Document) -> NodeId {
        let subcode = doc.create_element(QName::ns(ns::SOAP, "Subcode"));
        doc.append_element(subcode, QName::ns(ns::SOAP, "Value"));
        subcode
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// Fault code with an optional subcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultCode(NodeId);

impl FaultCode {
    const VALUE: Field = Field::value(0, Some(ns::SOAP), "Value", Converter::String);
    const SUBCODE: Field = Field::element(1, Some(ns::SOAP), "Subcode");

    /// Code value, such as `s:Receiver`.
    pub fn value(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::VALUE)
    }

    /// Set the code value.
    pub fn set_value(&self, doc: &mut Document, value: &str) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::VALUE, Some(value))
    }

    /// Subcode, if present.
    pub fn subcode(&self, doc: &Document) -> Option<FaultSubcode> {
        binding::get_element(doc, self, &Self::SUBCODE)
    }
}

impl XmlNode for FaultCode {
    const FIELDS: &'static [Field] = &[Self::VALUE, Self::SUBCODE];

    fn create(doc: &mut Document) -> NodeId {
        let code = doc.create_element(QName::ns(ns::SOAP, "Code"));
        doc.append_element(code, QName::ns(ns::SOAP, "Value"));
        let subcode = FaultSubcode::create(doc);
        doc.append_child(code, subcode);
        code
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// Human readable fault reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultReason(NodeId);

impl FaultReason {
    const TEXT: Field = Field::value(0, Some(ns::SOAP), "Text", Converter::String);

    /// Reason text.
    pub fn text(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::TEXT)
    }

    /// Set the reason text.
    pub fn set_text(&self, doc: &mut Document, text: &str) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::TEXT, Some(text))
    }
}

impl XmlNode for FaultReason {
    const FIELDS: &'static [Field] = &[Self::TEXT];

    fn create(doc: &mut Document) -> NodeId {
        let reason = doc.create_element(QName::ns(ns::SOAP, "Reason"));
        doc.append_element(reason, QName::ns(ns::SOAP, "Text"));
        reason
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// SOAP fault body payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault(NodeId);

impl Fault {
    const CODE: Field = Field::element(0, Some(ns::SOAP), "Code");
    const REASON: Field = Field::element(1, Some(ns::SOAP), "Reason");

    /// Fault code.
    pub fn code(&self, doc: &Document) -> Option<FaultCode> {
        binding::get_element(doc, self, &Self::CODE)
    }

    /// Fault reason.
    pub fn reason(&self, doc: &Document) -> Option<FaultReason> {
        binding::get_element(doc, self, &Self::REASON)
    }

    /// Whether `id` is a `s:Fault` element.
    pub fn matches(doc: &Document, id: NodeId) -> bool {
        doc.name(id).is(Some(ns::SOAP), "Fault")
    }
}

impl XmlNode for Fault {
    const FIELDS: &'static [Field] = &[Self::CODE, Self::REASON];

    fn create(doc: &mut Document) -> NodeId {
        let fault = doc.create_element(QName::ns(ns::SOAP, "Fault"));
        let code = FaultCode::create(doc);
        doc.append_child(fault, code);
        let reason = FaultReason::create(doc);
        doc.append_child(fault, reason);
        fault
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// WS-Security username token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsernameToken(NodeId);

impl UsernameToken {
    const USERNAME: Field = Field::value(0, Some(ns::WSSE), "Username", Converter::String);
    const PASSWORD: Field = Field::value(1, Some(ns::WSSE), "Password", Converter::String);
    const NONCE: Field = Field::value(2, Some(ns::WSSE), "Nonce", Converter::String);
    const CREATED: Field = Field::value(3, Some(ns::WSU), "Created", Converter::DateTime);

    /// Username.
    pub fn username(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::USERNAME)
    }

    /// Set the username.
    pub fn set_username(&self, doc: &mut Document, value: &str) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::USERNAME, Some(value))
    }

    /// Password.
    pub fn password(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::PASSWORD)
    }

    /// Set the password.
    pub fn set_password(&self, doc: &mut Document, value: &str) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::PASSWORD, Some(value))
    }

    /// Nonce.
    pub fn nonce(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::NONCE)
    }

    /// Set the nonce.
    pub fn set_nonce(&self, doc: &mut Document, value: &str) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::NONCE, Some(value))
    }

    /// Creation timestamp.
    pub fn created(&self, doc: &Document) -> Result<Option<XsDateTime>, BindingError> {
        binding::get_value(doc, self, &Self::CREATED)
    }

    /// Set the creation timestamp.
    pub fn set_created(&self, doc: &mut Document, value: XsDateTime) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::CREATED, Some(value))
    }
}

impl XmlNode for UsernameToken {
    const FIELDS: &'static [Field] = &[Self::USERNAME, Self::PASSWORD, Self::NONCE, Self::CREATED];

    fn create(doc: &mut Document) -> NodeId {
        let token = doc.create_element(QName::ns(ns::WSSE, "UsernameToken"));
        doc.append_element(token, QName::ns(ns::WSSE, "Username"));
        let password = doc.append_element(token, QName::ns(ns::WSSE, "Password"));
        doc.set_attribute(password, QName::ns(ns::WSSE, "Type"), PASSWORD_TEXT);
        doc.append_element(token, QName::ns(ns::WSSE, "Nonce"));
        doc.append_element(token, QName::ns(ns::WSU, "Created"));
        token
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// WS-Security header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Security(NodeId);

impl Security {
    const USERNAME_TOKEN: Field = Field::element(0, Some(ns::WSSE), "UsernameToken");

    /// Username token, if present.
    pub fn username_token(&self, doc: &Document) -> Option<UsernameToken> {
        binding::get_element(doc, self, &Self::USERNAME_TOKEN)
    }

    /// Install a fresh username token skeleton and return it.
    pub fn add_username_token(&self, doc: &mut Document) -> UsernameToken {
        binding::set_element(doc, self, &Self::USERNAME_TOKEN, None)
    }
}

impl XmlNode for Security {
    const FIELDS: &'static [Field] = &[Self::USERNAME_TOKEN];

    fn create(doc: &mut Document) -> NodeId {
        let security = doc.create_element(QName::ns(ns::WSSE, "Security"));
        doc.set_attribute(security, must_understand(), "1");
        security
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// SOAP header carrying WS-Addressing properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header(NodeId);

impl Header {
    const ACTION: Field =
        Field::value(0, Some(ns::ADDRESSING), "Action", Converter::String).nillable();
    const MESSAGE_ID: Field =
        Field::value(1, Some(ns::ADDRESSING), "MessageID", Converter::String).nillable();
    const TO: Field = Field::value(2, Some(ns::ADDRESSING), "To", Converter::String).nillable();
    const RELATES_TO: Field =
        Field::value(3, Some(ns::ADDRESSING), "RelatesTo", Converter::String).nillable();
    const SECURITY: Field = Field::element(4, Some(ns::WSSE), "Security").optional();

    /// `a:Action`.
    pub fn action(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::ACTION)
    }

    /// Set `a:Action`.
    pub fn set_action(&self, doc: &mut Document, value: Option<&str>) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::ACTION, value)
    }

    /// `a:MessageID`.
    pub fn message_id(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::MESSAGE_ID)
    }

    /// Set `a:MessageID`.
    pub fn set_message_id(
        &self,
        doc: &mut Document,
        value: Option<&str>,
    ) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::MESSAGE_ID, value)
    }

    /// `a:To`.
    pub fn to(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::TO)
    }

    /// Set `a:To`.
    pub fn set_to(&self, doc: &mut Document, value: Option<&str>) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::TO, value)
    }

    /// `a:RelatesTo`.
    pub fn relates_to(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::RELATES_TO)
    }

    /// Set `a:RelatesTo`.
    pub fn set_relates_to(
        &self,
        doc: &mut Document,
        value: Option<&str>,
    ) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::RELATES_TO, value)
    }

    /// `wsse:Security`, if present.
    pub fn security(&self, doc: &Document) -> Option<Security> {
        binding::get_element(doc, self, &Self::SECURITY)
    }

    /// Return the security block, creating it when absent.
    pub fn ensure_security(&self, doc: &mut Document) -> Security {
        match self.security(doc) {
            Some(security) => security,
            None => binding::set_element(doc, self, &Self::SECURITY, None),
        }
    }
}

impl XmlNode for Header {
    const FIELDS: &'static [Field] = &[
        Self::ACTION,
        Self::MESSAGE_ID,
        Self::TO,
        Self::RELATES_TO,
        Self::SECURITY,
    ];

    fn create(doc: &mut Document) -> NodeId {
        let header = doc.create_element(QName::ns(ns::SOAP, "Header"));

        let action = doc.append_element(header, QName::ns(ns::ADDRESSING, "Action"));
        doc.set_attribute(action, must_understand(), "1");
        doc.set_attribute(action, nil_attribute(), "true");

        let message_id = doc.append_element(header, QName::ns(ns::ADDRESSING, "MessageID"));
        doc.set_attribute(message_id, nil_attribute(), "true");

        let to = doc.append_element(header, QName::ns(ns::ADDRESSING, "To"));
        doc.set_attribute(to, must_understand(), "1");
        doc.set_attribute(to, nil_attribute(), "true");

        header
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// SOAP body holding a single payload element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Body(NodeId);

impl Body {
    const PAYLOAD: Field = Field::any(0, "*").optional();

    /// Payload element, if any.
    pub fn payload(&self, doc: &Document) -> Option<NodeId> {
        binding::get_node(doc, self, &Self::PAYLOAD)
    }

    /// Replace the payload element.
    pub fn set_payload(&self, doc: &mut Document, payload: NodeId) {
        binding::set_node(doc, self, &Self::PAYLOAD, payload)
    }
}

impl XmlNode for Body {
    const FIELDS: &'static [Field] = &[Self::PAYLOAD];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::SOAP, "Body"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// SOAP envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope(NodeId);

impl Envelope {
    const HEADER: Field = Field::element(0, Some(ns::SOAP), "Header");
    const BODY: Field = Field::element(1, Some(ns::SOAP), "Body");

    /// Create an envelope skeleton and make it the document root.
    pub fn new_document(doc: &mut Document) -> Self {
        let envelope = <Self as XmlNode>::new(doc);
        doc.set_root(envelope.node());
        envelope
    }

    /// Bind the root element of a received document.
    pub fn from_document(doc: &Document) -> Result<Self, BindingError> {
        let missing = || BindingError::NoSuchElement(QName::ns(ns::SOAP, "Envelope").to_clark());
        let root = doc.root().ok_or_else(missing)?;
        if !doc.name(root).is(Some(ns::SOAP), "Envelope") {
            return Err(missing());
        }
        Self::bind(doc, root)
    }

    /// Envelope header.
    pub fn header(&self, doc: &Document) -> Option<Header> {
        binding::get_element(doc, self, &Self::HEADER)
    }

    /// Envelope body.
    pub fn body(&self, doc: &Document) -> Option<Body> {
        binding::get_element(doc, self, &Self::BODY)
    }

    /// Body payload, if any.
    pub fn payload(&self, doc: &Document) -> Option<NodeId> {
        self.body(doc)?.payload(doc)
    }
}

impl XmlNode for Envelope {
    const FIELDS: &'static [Field] = &[Self::HEADER, Self::BODY];

    fn create(doc: &mut Document) -> NodeId {
        let envelope = doc.create_element(QName::ns(ns::SOAP, "Envelope"));
        let header = Header::create(doc);
        doc.append_child(envelope, header);
        let body = Body::create(doc);
        doc.append_child(envelope, body);
        envelope
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_skeleton() {
        let mut doc = Document::new();
        let envelope = Envelope::new_document(&mut doc);
        let header = envelope.header(&doc).unwrap();

        assert_eq!(header.action(&doc).unwrap(), None);
        assert_eq!(header.message_id(&doc).unwrap(), None);
        assert_eq!(header.to(&doc).unwrap(), None);
        assert!(header.security(&doc).is_none());
        assert!(envelope.payload(&doc).is_none());

        let action = doc.find_child(header.node(), Some(ns::ADDRESSING), "Action").unwrap();
        assert_eq!(doc.attribute(action, Some(ns::SOAP), "mustUnderstand"), Some("1"));
        assert_eq!(doc.attribute(action, Some(ns::XSI), "nil"), Some("true"));
    }

    #[test]
    fn test_header_values_clear_nil() {
        let mut doc = Document::new();
        let envelope = Envelope::new_document(&mut doc);
        let header = envelope.header(&doc).unwrap();
        header.set_action(&mut doc, Some("urn:action")).unwrap();
        header.set_relates_to(&mut doc, Some("urn:uuid:1")).unwrap();

        assert_eq!(header.action(&doc).unwrap().as_deref(), Some("urn:action"));
        let xml = doc.to_xml();
        assert!(xml.contains("<a:Action s:mustUnderstand=\"1\">urn:action</a:Action>"));
        // RelatesTo goes after To, not at the end of the header.
        let to = xml.find("<a:To").unwrap();
        let relates = xml.find("<a:RelatesTo").unwrap();
        assert!(to < relates);
    }

    #[test]
    fn test_security_after_addressing() {
        let mut doc = Document::new();
        let envelope = Envelope::new_document(&mut doc);
        let header = envelope.header(&doc).unwrap();
        let security = header.ensure_security(&mut doc);
        let token = security.add_username_token(&mut doc);
        token.set_username(&mut doc, "user").unwrap();

        let last = *doc.children(header.node()).last().unwrap();
        assert_eq!(last, security.node());
        let bound = header.security(&doc).unwrap().username_token(&doc).unwrap();
        assert_eq!(bound.username(&doc).unwrap().as_deref(), Some("user"));
        let password = doc.find_child(token.node(), Some(ns::WSSE), "Password").unwrap();
        assert_eq!(doc.attribute(password, Some(ns::WSSE), "Type"), Some(PASSWORD_TEXT));
    }

    #[test]
    fn test_parse_fault() {
        let doc = Document::parse(
            r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
                           xmlns:a="http://www.w3.org/2005/08/addressing">
                 <s:Header><a:Action>http://www.w3.org/2005/08/addressing/soap/fault</a:Action></s:Header>
                 <s:Body>
                   <s:Fault>
                     <s:Code><s:Value>s:Receiver</s:Value>
                       <s:Subcode><s:Value>a:InternalServiceFault</s:Value></s:Subcode>
                     </s:Code>
                     <s:Reason><s:Text xml:lang="en-US">Denied by policy</s:Text></s:Reason>
                   </s:Fault>
                 </s:Body>
               </s:Envelope>"#,
        )
        .unwrap();

        let envelope = Envelope::from_document(&doc).unwrap();
        let payload = envelope.payload(&doc).unwrap();
        assert!(Fault::matches(&doc, payload));

        let fault = Fault::bind(&doc, payload).unwrap();
        let code = fault.code(&doc).unwrap();
        assert_eq!(code.value(&doc).unwrap().as_deref(), Some("s:Receiver"));
        assert_eq!(
            code.subcode(&doc).unwrap().value(&doc).unwrap().as_deref(),
            Some("a:InternalServiceFault")
        );
        assert_eq!(
            fault.reason(&doc).unwrap().text(&doc).unwrap().as_deref(),
            Some("Denied by policy")
        );
    }

    #[test]
    fn test_from_document_rejects_other_roots() {
        let doc = Document::parse("<html/>").unwrap();
        assert!(Envelope::from_document(&doc).is_err());
    }
}
