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

//! MS-XCEP message models.
//!
//! Request side: [`GetPolicies`] with its [`Client`] and [`RequestFilter`].
//! Response side: [`GetPoliciesResponse`] carrying a [`Response`] of
//! [`Policy`] entries and the issuing [`CertificateAuthority`] list, each CA
//! advertising one [`CaUri`] per supported authentication method.

use crate::error::BindingError;
use crate::soap::AuthMethod;
use crate::xml::binding::{self, Field};
use crate::xml::{nil_attribute, ns, Converter, Document, NodeId, QName, XmlNode, XsDateTime};

const CEP: Option<&str> = Some(ns::CEP);

fn nil_child(doc: &mut Document, parent: NodeId, local: &str) -> NodeId {
    let child = doc.append_element(parent, QName::ns(ns::CEP, local));
    doc.set_attribute(child, nil_attribute(), "true");
    child
}

/// Client state and preferences sent with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Client(NodeId);

impl Client {
    const LAST_UPDATE: Field = Field::value(0, CEP, "lastUpdate", Converter::DateTime).nillable();
    const PREFERRED_LANGUAGE: Field =
        Field::value(1, CEP, "preferredLanguage", Converter::String).nillable();

    /// Time of the last policy update seen by the client.
    pub fn last_update(&self, doc: &Document) -> Result<Option<XsDateTime>, BindingError> {
        binding::get_value(doc, self, &Self::LAST_UPDATE)
    }

    /// Set the last update time; `None` sends nil.
    pub fn set_last_update(
        &self,
        doc: &mut Document,
        value: Option<XsDateTime>,
    ) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::LAST_UPDATE, value)
    }

    /// Preferred language tag.
    pub fn preferred_language(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::PREFERRED_LANGUAGE)
    }

    /// Set the preferred language; `None` sends nil.
    pub fn set_preferred_language(
        &self,
        doc: &mut Document,
        value: Option<&str>,
    ) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::PREFERRED_LANGUAGE, value)
    }
}

impl XmlNode for Client {
    const FIELDS: &'static [Field] = &[Self::LAST_UPDATE, Self::PREFERRED_LANGUAGE];

    fn create(doc: &mut Document) -> NodeId {
        let client = doc.create_element(QName::ns(ns::CEP, "client"));
        nil_child(doc, client, "lastUpdate");
        nil_child(doc, client, "preferredLanguage");
        client
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// Filter restricting which policies the server returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFilter(NodeId);

impl RequestFilter {
    const POLICY_OIDS: Field =
        Field::value_list(0, CEP, "policyOIDs", CEP, "oid", Converter::String).nillable();
    const CLIENT_VERSION: Field =
        Field::value(1, CEP, "clientVersion", Converter::SIGNED_INT).nillable();
    const SERVER_VERSION: Field = Field::value(2, CEP, "serverVersion", Converter::SIGNED_INT)
        .nillable()
        .optional();

    /// Requested policy OIDs; `None` when nil.
    pub fn policy_oids(&self, doc: &Document) -> Result<Option<Vec<String>>, BindingError> {
        binding::get_value_list(doc, self, &Self::POLICY_OIDS)?
            .map(|list| list.items(doc))
            .transpose()
    }

    /// Replace the requested policy OIDs; `None` sends nil.
    pub fn set_policy_oids(
        &self,
        doc: &mut Document,
        oids: Option<&[&str]>,
    ) -> Result<(), BindingError> {
        let Some(oids) = oids else {
            return binding::nil_list(doc, self, &Self::POLICY_OIDS);
        };
        let list = binding::ensure_value_list(doc, self, &Self::POLICY_OIDS)?;
        while !list.is_empty(doc) {
            list.remove(doc, 0)?;
        }
        for oid in oids {
            list.push(doc, *oid)?;
        }
        Ok(())
    }

    /// Client protocol version.
    pub fn client_version(&self, doc: &Document) -> Result<Option<i32>, BindingError> {
        binding::get_value(doc, self, &Self::CLIENT_VERSION)
    }

    /// Set the client protocol version.
    pub fn set_client_version(
        &self,
        doc: &mut Document,
        value: Option<i32>,
    ) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::CLIENT_VERSION, value)
    }

    /// Server protocol version.
    pub fn server_version(&self, doc: &Document) -> Result<Option<i32>, BindingError> {
        binding::get_value(doc, self, &Self::SERVER_VERSION)
    }

    /// Set the server protocol version.
    pub fn set_server_version(
        &self,
        doc: &mut Document,
        value: Option<i32>,
    ) -> Result<(), BindingError> {
        binding::set_value(doc, self, &Self::SERVER_VERSION, value)
    }

    /// Drop the optional server version element.
    pub fn remove_server_version(&self, doc: &mut Document) -> Result<(), BindingError> {
        binding::delete(doc, self, &Self::SERVER_VERSION)
    }
}

impl XmlNode for RequestFilter {
    const FIELDS: &'static [Field] =
        &[Self::POLICY_OIDS, Self::CLIENT_VERSION, Self::SERVER_VERSION];

    fn create(doc: &mut Document) -> NodeId {
        let filter = doc.create_element(QName::ns(ns::CEP, "requestFilter"));
        nil_child(doc, filter, "policyOIDs");
        nil_child(doc, filter, "clientVersion");
        nil_child(doc, filter, "serverVersion");
        filter
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// `GetPolicies` request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetPolicies(NodeId);

impl GetPolicies {
    const CLIENT: Field = Field::element(0, CEP, "client");
    const REQUEST_FILTER: Field = Field::element(1, CEP, "requestFilter").nillable();

    /// Client block.
    pub fn client(&self, doc: &Document) -> Option<Client> {
        binding::get_element(doc, self, &Self::CLIENT)
    }

    /// Request filter, unless nil.
    pub fn request_filter(&self, doc: &Document) -> Option<RequestFilter> {
        binding::get_element(doc, self, &Self::REQUEST_FILTER)
    }
}

impl XmlNode for GetPolicies {
    const FIELDS: &'static [Field] = &[Self::CLIENT, Self::REQUEST_FILTER];

    fn create(doc: &mut Document) -> NodeId {
        let request = doc.create_element(QName::ns(ns::CEP, "GetPolicies"));
        let client = Client::create(doc);
        doc.append_child(request, client);
        let filter = RequestFilter::create(doc);
        doc.append_child(request, filter);
        request
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// One enrollment endpoint of a CA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaUri(NodeId);

impl CaUri {
    const CLIENT_AUTHENTICATION: Field =
        Field::value(0, CEP, "clientAuthentication", Converter::ClientAuthentication);
    const URI: Field = Field::value(1, CEP, "uri", Converter::String);
    const PRIORITY: Field = Field::value(2, CEP, "priority", Converter::UNSIGNED_INT).nillable();
    const RENEWAL_ONLY: Field = Field::value(3, CEP, "renewalOnly", Converter::Boolean).nillable();

    /// Authentication method accepted by this endpoint.
    pub fn client_authentication(&self, doc: &Document) -> Result<Option<AuthMethod>, BindingError> {
        binding::get_value(doc, self, &Self::CLIENT_AUTHENTICATION)
    }

    /// Endpoint URI.
    pub fn uri(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::URI)
    }

    /// Priority, lower is preferred.
    pub fn priority(&self, doc: &Document) -> Result<Option<u32>, BindingError> {
        binding::get_value(doc, self, &Self::PRIORITY)
    }

    /// Whether the endpoint only accepts renewals.
    pub fn renewal_only(&self, doc: &Document) -> Result<Option<bool>, BindingError> {
        binding::get_value(doc, self, &Self::RENEWAL_ONLY)
    }
}

impl XmlNode for CaUri {
    const FIELDS: &'static [Field] = &[
        Self::CLIENT_AUTHENTICATION,
        Self::URI,
        Self::PRIORITY,
        Self::RENEWAL_ONLY,
    ];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::CEP, "cAURI"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// Issuing certificate authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateAuthority(NodeId);

impl CertificateAuthority {
    const URIS: Field = Field::element_list(0, CEP, "uris", CEP, "cAURI");
    const CERTIFICATE: Field = Field::value(1, CEP, "certificate", Converter::Certificate);
    const ENROLL_PERMISSION: Field = Field::value(2, CEP, "enrollPermission", Converter::Boolean);
    const REFERENCE_ID: Field = Field::value(3, CEP, "cAReferenceID", Converter::SIGNED_INT);

    /// Enrollment endpoints; empty when the element is missing.
    pub fn uris(&self, doc: &Document) -> Result<Vec<CaUri>, BindingError> {
        Ok(binding::get_element_list(doc, self, &Self::URIS)?
            .map(|list| list.items(doc))
            .unwrap_or_default())
    }

    /// CA signing certificate as PEM.
    pub fn certificate(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::CERTIFICATE)
    }

    /// Whether the requestor may enroll with this CA.
    pub fn enroll_permission(&self, doc: &Document) -> Result<Option<bool>, BindingError> {
        binding::get_value(doc, self, &Self::ENROLL_PERMISSION)
    }

    /// Reference id used by policies.
    pub fn reference_id(&self, doc: &Document) -> Result<Option<i32>, BindingError> {
        binding::get_value(doc, self, &Self::REFERENCE_ID)
    }
}

impl XmlNode for CertificateAuthority {
    const FIELDS: &'static [Field] = &[
        Self::URIS,
        Self::CERTIFICATE,
        Self::ENROLL_PERMISSION,
        Self::REFERENCE_ID,
    ];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::CEP, "cA"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// Policy attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes(NodeId);

impl Attributes {
    const COMMON_NAME: Field = Field::value(0, CEP, "commonName", Converter::String);

    /// Template common name.
    pub fn common_name(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::COMMON_NAME)
    }
}

impl XmlNode for Attributes {
    const FIELDS: &'static [Field] = &[Self::COMMON_NAME];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::CEP, "attributes"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// Certificate enrollment policy (a template).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy(NodeId);

impl Policy {
    const CAS: Field =
        Field::value_list(0, CEP, "cAs", CEP, "cAReference", Converter::Integer).nillable();
    const ATTRIBUTES: Field = Field::element(1, CEP, "attributes").nillable();

    /// Reference ids of the issuing CAs; `None` when nil or absent.
    pub fn ca_references(&self, doc: &Document) -> Result<Option<Vec<i64>>, BindingError> {
        binding::get_value_list(doc, self, &Self::CAS)?
            .map(|list| list.items(doc))
            .transpose()
    }

    /// Policy attributes.
    pub fn attributes(&self, doc: &Document) -> Option<Attributes> {
        binding::get_element(doc, self, &Self::ATTRIBUTES)
    }

    /// Template common name, read through the attributes.
    pub fn common_name(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        match self.attributes(doc) {
            Some(attributes) => attributes.common_name(doc),
            None => Ok(None),
        }
    }
}

impl XmlNode for Policy {
    const FIELDS: &'static [Field] = &[Self::CAS, Self::ATTRIBUTES];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::CEP, "policy"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// Policy response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response(NodeId);

impl Response {
    const POLICY_ID: Field = Field::value(0, CEP, "policyID", Converter::String);
    const FRIENDLY_NAME: Field =
        Field::value(1, CEP, "policyFriendlyName", Converter::String).nillable();
    const NEXT_UPDATE_HOURS: Field =
        Field::value(2, CEP, "nextUpdateHours", Converter::UNSIGNED_INT).nillable();
    const POLICIES_NOT_CHANGED: Field =
        Field::value(3, CEP, "policiesNotChanged", Converter::Boolean).nillable();
    const POLICIES: Field = Field::element_list(4, CEP, "policies", CEP, "policy").nillable();

    /// Policy identifier.
    pub fn policy_id(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::POLICY_ID)
    }

    /// Human readable policy name.
    pub fn friendly_name(&self, doc: &Document) -> Result<Option<String>, BindingError> {
        binding::get_value(doc, self, &Self::FRIENDLY_NAME)
    }

    /// Recommended hours until the next policy fetch.
    pub fn next_update_hours(&self, doc: &Document) -> Result<Option<u32>, BindingError> {
        binding::get_value(doc, self, &Self::NEXT_UPDATE_HOURS)
    }

    /// Whether policies are unchanged since the client's last update.
    pub fn policies_not_changed(&self, doc: &Document) -> Result<Option<bool>, BindingError> {
        binding::get_value(doc, self, &Self::POLICIES_NOT_CHANGED)
    }

    /// Policies; `None` when nil or absent.
    pub fn policies(&self, doc: &Document) -> Result<Option<Vec<Policy>>, BindingError> {
        Ok(binding::get_element_list(doc, self, &Self::POLICIES)?.map(|list| list.items(doc)))
    }
}

impl XmlNode for Response {
    const FIELDS: &'static [Field] = &[
        Self::POLICY_ID,
        Self::FRIENDLY_NAME,
        Self::NEXT_UPDATE_HOURS,
        Self::POLICIES_NOT_CHANGED,
        Self::POLICIES,
    ];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::CEP, "response"))
    }

    fn from_node(id: NodeId) -> Self {
        Self(id)
    }

    fn node(&self) -> NodeId {
        self.0
    }
}

/// `GetPoliciesResponse` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetPoliciesResponse(NodeId);

impl GetPoliciesResponse {
    const RESPONSE: Field = Field::element(0, CEP, "response").nillable();
    const CAS: Field = Field::element_list(1, CEP, "cAs", CEP, "cA").nillable();

    /// Bind a received payload, checking its name.
    pub fn from_payload(doc: &Document, payload: NodeId) -> Result<Self, BindingError> {
        if !doc.name(payload).is(CEP, "GetPoliciesResponse") {
            return Err(BindingError::NoSuchElement(
                QName::ns(ns::CEP, "GetPoliciesResponse").to_clark(),
            ));
        }
        Self::bind(doc, payload)
    }

    /// Policy response, unless nil.
    pub fn response(&self, doc: &Document) -> Option<Response> {
        binding::get_element(doc, self, &Self::RESPONSE)
    }

    /// Issuing CAs; `None` when nil or absent.
    pub fn cas(&self, doc: &Document) -> Result<Option<Vec<CertificateAuthority>>, BindingError> {
        Ok(binding::get_element_list(doc, self, &Self::CAS)?.map(|list| list.items(doc)))
    }

    /// Policies of the embedded response; `None` when either level is nil.
    pub fn policies(&self, doc: &Document) -> Result<Option<Vec<Policy>>, BindingError> {
        match self.response(doc) {
            Some(response) => response.policies(doc),
            None => Ok(None),
        }
    }
}

impl XmlNode for GetPoliciesResponse {
    const FIELDS: &'static [Field] = &[Self::RESPONSE, Self::CAS];

    fn create(doc: &mut Document) -> NodeId {
        doc.create_element(QName::ns(ns::CEP, "GetPoliciesResponse"))
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
    fn test_get_policies_skeleton() {
        let mut doc = Document::new();
        let request = GetPolicies::new(&mut doc);
        doc.set_root(request.node());

        let client = request.client(&doc).unwrap();
        assert_eq!(client.last_update(&doc).unwrap(), None);
        assert_eq!(client.preferred_language(&doc).unwrap(), None);

        let filter = request.request_filter(&doc).unwrap();
        assert_eq!(filter.policy_oids(&doc).unwrap(), None);
        assert_eq!(filter.client_version(&doc).unwrap(), None);
        assert_eq!(filter.server_version(&doc).unwrap(), None);

        assert_eq!(
            doc.to_xml(),
            "<xcep:GetPolicies \
             xmlns:xcep=\"http://schemas.microsoft.com/windows/pki/2009/01/enrollmentpolicy\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
             <xcep:client><xcep:lastUpdate xsi:nil=\"true\"/>\
             <xcep:preferredLanguage xsi:nil=\"true\"/></xcep:client>\
             <xcep:requestFilter><xcep:policyOIDs xsi:nil=\"true\"/>\
             <xcep:clientVersion xsi:nil=\"true\"/>\
             <xcep:serverVersion xsi:nil=\"true\"/></xcep:requestFilter>\
             </xcep:GetPolicies>"
        );
    }

    #[test]
    fn test_request_filter_values() {
        let mut doc = Document::new();
        let request = GetPolicies::new(&mut doc);
        let filter = request.request_filter(&doc).unwrap();
        filter
            .set_policy_oids(&mut doc, Some(&["1.3.6.1.4.1.311.21.8.1", "1.3.6.1.4.1.311.21.8.2"]))
            .unwrap();
        filter.set_client_version(&mut doc, Some(1)).unwrap();
        filter.remove_server_version(&mut doc).unwrap();

        assert_eq!(
            filter.policy_oids(&doc).unwrap().unwrap(),
            ["1.3.6.1.4.1.311.21.8.1", "1.3.6.1.4.1.311.21.8.2"]
        );
        assert_eq!(filter.client_version(&doc).unwrap(), Some(1));
        assert!(doc.find_child(filter.node(), CEP, "serverVersion").is_none());

        filter.set_policy_oids(&mut doc, None).unwrap();
        assert_eq!(filter.policy_oids(&doc).unwrap(), None);

        let client = request.client(&doc).unwrap();
        client.set_preferred_language(&mut doc, Some("en-US")).unwrap();
        assert_eq!(client.preferred_language(&doc).unwrap().as_deref(), Some("en-US"));
    }

    #[test]
    fn test_parse_response() {
        let doc = Document::parse(&format!(
            r#"<GetPoliciesResponse xmlns="{cep}" xmlns:xsi="{xsi}">
                 <response>
                   <policyID>{{A1B2}}</policyID>
                   <policyFriendlyName xsi:nil="true"/>
                   <nextUpdateHours>8</nextUpdateHours>
                   <policiesNotChanged>false</policiesNotChanged>
                   <policies>
                     <policy>
                       <cAs><cAReference>0</cAReference></cAs>
                       <attributes><commonName>Machine</commonName></attributes>
                     </policy>
                     <policy>
                       <cAs xsi:nil="true"/>
                       <attributes><commonName>Orphan</commonName></attributes>
                     </policy>
                   </policies>
                 </response>
                 <cAs>
                   <cA>
                     <uris>
                       <cAURI>
                         <clientAuthentication>2</clientAuthentication>
                         <uri>https://ca.example.com/CES</uri>
                         <priority>1</priority>
                         <renewalOnly>false</renewalOnly>
                       </cAURI>
                     </uris>
                     <certificate>QUJD</certificate>
                     <enrollPermission>true</enrollPermission>
                     <cAReferenceID>0</cAReferenceID>
                   </cA>
                 </cAs>
               </GetPoliciesResponse>"#,
            cep = ns::CEP,
            xsi = ns::XSI
        ))
        .unwrap();
        let message = GetPoliciesResponse::from_payload(&doc, doc.root().unwrap()).unwrap();
        let response = message.response(&doc).unwrap();
        assert_eq!(response.policy_id(&doc).unwrap().as_deref(), Some("{A1B2}"));
        assert_eq!(response.friendly_name(&doc).unwrap(), None);
        assert_eq!(response.next_update_hours(&doc).unwrap(), Some(8));
        assert_eq!(response.policies_not_changed(&doc).unwrap(), Some(false));

        let policies = message.policies(&doc).unwrap().unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0].common_name(&doc).unwrap().as_deref(), Some("Machine"));
        assert_eq!(policies[0].ca_references(&doc).unwrap(), Some(vec![0]));
        assert_eq!(policies[1].ca_references(&doc).unwrap(), None);

        let cas = message.cas(&doc).unwrap().unwrap();
        let ca = cas[0];
        assert_eq!(ca.reference_id(&doc).unwrap(), Some(0));
        assert_eq!(ca.enroll_permission(&doc).unwrap(), Some(true));
        assert_eq!(
            ca.certificate(&doc).unwrap().as_deref(),
            Some("-----BEGIN CERTIFICATE-----\nQUJD\n-----END CERTIFICATE-----")
        );

        let uri = ca.uris(&doc).unwrap()[0];
        assert_eq!(uri.client_authentication(&doc).unwrap(), Some(AuthMethod::Kerberos));
        assert_eq!(uri.uri(&doc).unwrap().as_deref(), Some("https://ca.example.com/CES"));
        assert_eq!(uri.priority(&doc).unwrap(), Some(1));
        assert_eq!(uri.renewal_only(&doc).unwrap(), Some(false));
    }

    #[test]
    fn test_nil_collections_are_unknown() {
        let doc = Document::parse(&format!(
            r#"<GetPoliciesResponse xmlns="{}" xmlns:xsi="{}">
                 <response xsi:nil="true"/><cAs xsi:nil="true"/>
               </GetPoliciesResponse>"#,
            ns::CEP,
            ns::XSI
        ))
        .unwrap();
        let message = GetPoliciesResponse::from_payload(&doc, doc.root().unwrap()).unwrap();
        assert!(message.response(&doc).is_none());
        assert_eq!(message.policies(&doc).unwrap(), None);
        assert_eq!(message.cas(&doc).unwrap(), None);
    }

    #[test]
    fn test_wrong_payload_rejected() {
        let doc = Document::parse(&format!(r#"<GetPolicies xmlns="{}"/>"#, ns::CEP)).unwrap();
        assert!(GetPoliciesResponse::from_payload(&doc, doc.root().unwrap()).is_err());
    }
}
