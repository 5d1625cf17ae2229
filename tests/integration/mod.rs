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

//! Integration test utilities and helpers
//!
//! A wiremock server stands in for the policy (CEP) and enrollment (CES)
//! endpoints and for the AIA certificate downloads.

mod certmonger_test;
mod chain_test;
mod enrollment_test;
mod policy_test;

use usg_cepces::xml::ns;
use usg_cepces::{Configuration, EndpointType};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

pub const POLICY_PATH: &str = "/ADPolicyProvider_CEP_UsernamePassword/service.svc/CEP";
pub const ENROLLMENT_PATH: &str = "/Example-CA_CES_UsernamePassword/service.svc/CES";

pub const POLICY_RESPONSE_ACTION: &str =
    "http://schemas.microsoft.com/windows/pki/2009/01/enrollmentpolicy/IPolicy/GetPoliciesResponse";
pub const ENROLLMENT_RESPONSE_ACTION: &str =
    "http://schemas.microsoft.com/windows/pki/2009/01/enrollment/RSTRC/wstep";
pub const FAULT_ACTION: &str = "http://www.w3.org/2005/08/addressing/soap/fault";

/// Mock CEP/CES server builder for integration tests
pub struct MockCepServer {
    server: MockServer,
}

impl MockCepServer {
    /// Create a new mock server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of the mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// URL of the policy endpoint
    pub fn policy_url(&self) -> String {
        format!("{}{}", self.url(), POLICY_PATH)
    }

    /// URL of the enrollment endpoint
    pub fn enrollment_url(&self) -> String {
        format!("{}{}", self.url(), ENROLLMENT_PATH)
    }

    /// Get a reference to the inner MockServer for custom mocking
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Mock a GetPoliciesResponse carrying `payload`
    pub async fn mock_policies(&self, payload: &str) {
        Mock::given(method("POST"))
            .and(path(POLICY_PATH))
            .and(body_string_contains("GetPolicies"))
            .respond_with(soap(
                200,
                fixtures::envelope(POLICY_RESPONSE_ACTION, payload),
            ))
            .mount(&self.server)
            .await;
    }

    /// Mock the answer to an Issue request
    pub async fn mock_issue(&self, responses: &str) {
        self.mock_enrollment("/Issue", responses).await;
    }

    /// Mock the answer to a Query (poll) request
    pub async fn mock_query(&self, responses: &str) {
        self.mock_enrollment("/Query", responses).await;
    }

    async fn mock_enrollment(&self, request_type: &str, responses: &str) {
        Mock::given(method("POST"))
            .and(path(ENROLLMENT_PATH))
            .and(body_string_contains(request_type))
            .respond_with(soap(
                200,
                fixtures::envelope(
                    ENROLLMENT_RESPONSE_ACTION,
                    &fixtures::response_collection(responses),
                ),
            ))
            .mount(&self.server)
            .await;
    }

    /// Mock a SOAP fault (HTTP 500) on `endpoint_path`
    pub async fn mock_fault(&self, endpoint_path: &str, reason: &str) {
        Mock::given(method("POST"))
            .and(path(endpoint_path))
            .respond_with(soap(
                500,
                fixtures::envelope(FAULT_ACTION, &fixtures::fault(reason)),
            ))
            .mount(&self.server)
            .await;
    }

    /// Mock a plain HTTP error on `endpoint_path`
    pub async fn mock_status(&self, endpoint_path: &str, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(endpoint_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Serve a DER certificate for AIA downloads
    pub async fn mock_certificate(&self, cert_path: &str, der: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(cert_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(der)
                    .insert_header("Content-Type", "application/pkix-cert"),
            )
            .mount(&self.server)
            .await;
    }

    /// Configuration pointing at the policy endpoint
    pub fn policy_config(&self) -> Configuration {
        Configuration::builder()
            .endpoint(self.policy_url())
            .expect("Valid URL")
            .endpoint_type(EndpointType::Policy)
            .poll_interval(3600)
            .build()
            .expect("Valid config")
    }

    /// Configuration pointing directly at the enrollment endpoint
    pub fn enrollment_config(&self) -> Configuration {
        Configuration::builder()
            .endpoint(self.enrollment_url())
            .expect("Valid URL")
            .endpoint_type(EndpointType::Enrollment)
            .build()
            .expect("Valid config")
    }
}

fn soap(status: u16, body: String) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_string(body)
        .insert_header("Content-Type", SOAP_CONTENT_TYPE)
}

/// Test fixture helpers
pub mod fixtures {
    use super::*;
    use base64::prelude::*;
    use const_oid::db::rfc5280::ID_AD_CA_ISSUERS;
    use der::asn1::Ia5String;
    use der::Encode;
    use rcgen::{
        BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType, IsCa,
        KeyPair,
    };
    use x509_cert::ext::pkix::name::GeneralName;
    use x509_cert::ext::pkix::{AccessDescription, AuthorityInfoAccessSyntax};

    /// Wrap `payload` in a SOAP 1.2 envelope
    pub fn envelope(action: &str, payload: &str) -> String {
        format!(
            r#"<s:Envelope xmlns:s="{soap}" xmlns:a="{addressing}"><s:Header><a:Action s:mustUnderstand="1">{action}</a:Action></s:Header><s:Body>{payload}</s:Body></s:Envelope>"#,
            soap = ns::SOAP,
            addressing = ns::ADDRESSING,
            action = action,
            payload = payload
        )
    }

    /// A `s:Fault` payload
    pub fn fault(reason: &str) -> String {
        format!(
            "<s:Fault><s:Code><s:Value>s:Receiver</s:Value>\
             <s:Subcode><s:Value xmlns:a=\"{}\">a:InternalServiceFault</s:Value></s:Subcode>\
             </s:Code><s:Reason><s:Text xml:lang=\"en-US\">{}</s:Text></s:Reason></s:Fault>",
            ns::ADDRESSING,
            reason
        )
    }

    /// A `cAURI` entry
    pub fn ca_uri(auth: u8, uri: &str, priority: u32, renewal_only: bool) -> String {
        format!(
            "<cAURI><clientAuthentication>{}</clientAuthentication><uri>{}</uri>\
             <priority>{}</priority><renewalOnly>{}</renewalOnly></cAURI>",
            auth, uri, priority, renewal_only
        )
    }

    /// A `cA` entry with a base64 DER certificate
    pub fn ca(id: u32, certificate_der: &[u8], uris: &[String]) -> String {
        format!(
            "<cA><uris>{}</uris><certificate>{}</certificate>\
             <enrollPermission>true</enrollPermission><cAReferenceID>{}</cAReferenceID></cA>",
            uris.concat(),
            BASE64_STANDARD.encode(certificate_der),
            id
        )
    }

    /// A `policy` entry
    pub fn policy(name: &str, ca_references: &[u32]) -> String {
        let refs: String = ca_references
            .iter()
            .map(|r| format!("<cAReference>{}</cAReference>", r))
            .collect();
        format!(
            "<policy><policyOIDReference>0</policyOIDReference><cAs>{}</cAs>\
             <attributes><commonName>{}</commonName><policySchema>2</policySchema>\
             </attributes></policy>",
            refs, name
        )
    }

    /// A `GetPoliciesResponse` payload
    pub fn policies_response(policies: &[String], cas: &[String]) -> String {
        format!(
            "<GetPoliciesResponse xmlns=\"{}\" xmlns:xsi=\"{}\"><response>\
             <policyID>{{3B6C4E8A-2F0B-4D55-9E5C-1A2B3C4D5E6F}}</policyID>\
             <policyFriendlyName xsi:nil=\"true\"/><nextUpdateHours>8</nextUpdateHours>\
             <policiesNotChanged xsi:nil=\"true\"/><policies>{}</policies></response>\
             <cAs>{}</cAs><oIDs xsi:nil=\"true\"/></GetPoliciesResponse>",
            ns::CEP,
            ns::XSI,
            policies.concat(),
            cas.concat()
        )
    }

    /// A `RequestSecurityTokenResponseCollection` payload
    pub fn response_collection(responses: &str) -> String {
        format!(
            "<RequestSecurityTokenResponseCollection xmlns=\"{}\" xmlns:wsse=\"{}\" \
             xmlns:enr=\"{}\">{}</RequestSecurityTokenResponseCollection>",
            ns::WST,
            ns::WSSE,
            ns::ENROLLMENT,
            responses
        )
    }

    /// An issued response; the token carries the `&#xD;` artifact on every
    /// line, as Microsoft servers send it.
    pub fn issued(request_id: u32, certificate_der: &[u8]) -> String {
        let encoded = BASE64_STANDARD.encode(certificate_der);
        let lines: Vec<&str> = encoded
            .as_bytes()
            .chunks(64)
            .map(|chunk| std::str::from_utf8(chunk).expect("base64 is ASCII"))
            .collect();
        format!(
            "<RequestSecurityTokenResponse>\
             <TokenType>http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3</TokenType>\
             <enr:DispositionMessage xml:lang=\"en-US\">Issued</enr:DispositionMessage>\
             <RequestedSecurityToken><wsse:BinarySecurityToken>{}</wsse:BinarySecurityToken>\
             </RequestedSecurityToken><enr:RequestID>{}</enr:RequestID>\
             </RequestSecurityTokenResponse>",
            lines.join("&amp;#xD;\n"),
            request_id
        )
    }

    /// A pending response referring to `reference`
    pub fn pending(request_id: u32, reference: &str) -> String {
        format!(
            "<RequestSecurityTokenResponse>\
             <enr:DispositionMessage xml:lang=\"en-US\">Taken Under Submission</enr:DispositionMessage>\
             <RequestedSecurityToken><wsse:SecurityTokenReference>\
             <wsse:Reference URI=\"{}\"/></wsse:SecurityTokenReference></RequestedSecurityToken>\
             <enr:RequestID>{}</enr:RequestID></RequestSecurityTokenResponse>",
            reference, request_id
        )
    }

    /// A PEM certificate signing request
    pub fn csr() -> String {
        let key = KeyPair::generate().expect("Key generation failed");
        let mut params = CertificateParams::new(vec!["host.example.com".to_string()])
            .expect("Valid params");
        params.distinguished_name = DistinguishedName::new();
        params
            .distinguished_name
            .push(DnType::CommonName, "host.example.com");
        params
            .serialize_request(&key)
            .expect("CSR generation failed")
            .pem()
            .expect("CSR encoding failed")
    }

    /// Root, intermediate and leaf certificates linked by AIA URLs under
    /// `base_url`.
    pub struct Pki {
        pub root: Vec<u8>,
        pub intermediate: Vec<u8>,
        pub leaf: Vec<u8>,
    }

    pub const ROOT_PATH: &str = "/pki/root.crt";
    pub const INTERMEDIATE_PATH: &str = "/pki/intermediate.crt";

    impl Pki {
        pub fn generate(base_url: &str) -> Self {
            let root_key = KeyPair::generate().expect("Key generation failed");
            let root = params("Example Root CA", true, None)
                .self_signed(&root_key)
                .expect("Root signing failed");

            let intermediate_key = KeyPair::generate().expect("Key generation failed");
            let root_url = format!("{}{}", base_url, ROOT_PATH);
            let intermediate = params("Example Issuing CA", true, Some(&root_url))
                .signed_by(&intermediate_key, &root, &root_key)
                .expect("Intermediate signing failed");

            let leaf_key = KeyPair::generate().expect("Key generation failed");
            let intermediate_url = format!("{}{}", base_url, INTERMEDIATE_PATH);
            let leaf = params("host.example.com", false, Some(&intermediate_url))
                .signed_by(&leaf_key, &intermediate, &intermediate_key)
                .expect("Leaf signing failed");

            Self {
                root: root.der().to_vec(),
                intermediate: intermediate.der().to_vec(),
                leaf: leaf.der().to_vec(),
            }
        }

        /// Intermediate with a flipped bit in its signature
        pub fn corrupted_intermediate(&self) -> Vec<u8> {
            let mut der = self.intermediate.clone();
            if let Some(last) = der.last_mut() {
                *last ^= 0x01;
            }
            der
        }

        /// Serve the root and intermediate for AIA downloads
        pub async fn serve(&self, server: &MockCepServer) {
            server.mock_certificate(ROOT_PATH, self.root.clone()).await;
            server
                .mock_certificate(INTERMEDIATE_PATH, self.intermediate.clone())
                .await;
        }
    }

    fn params(common_name: &str, ca: bool, issuer_url: Option<&str>) -> CertificateParams {
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("Valid params");
        params.distinguished_name = DistinguishedName::new();
        params.distinguished_name.push(DnType::CommonName, common_name);
        if ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        }
        if let Some(url) = issuer_url {
            params.custom_extensions.push(aia_extension(url));
        }
        params
    }

    fn aia_extension(url: &str) -> CustomExtension {
        let aia = AuthorityInfoAccessSyntax(vec![AccessDescription {
            access_method: ID_AD_CA_ISSUERS,
            access_location: GeneralName::UniformResourceIdentifier(
                Ia5String::new(url).expect("ASCII URL"),
            ),
        }]);
        CustomExtension::from_oid_content(
            &[1, 3, 6, 1, 5, 5, 7, 1, 1],
            aia.to_der().expect("AIA encoding failed"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let mock_server = MockCepServer::start().await;
        assert!(mock_server.url().starts_with("http://"));
        assert!(mock_server.policy_url().ends_with("/CEP"));
    }

    #[test]
    fn test_pki_is_linked() {
        let pki = fixtures::Pki::generate("http://127.0.0.1:1");
        let root = usg_cepces::chain::parse_certificate(&pki.root).unwrap();
        let intermediate = usg_cepces::chain::parse_certificate(&pki.intermediate).unwrap();
        let leaf = usg_cepces::chain::parse_certificate(&pki.leaf).unwrap();
        assert!(usg_cepces::chain::is_self_issued(&root));
        assert!(usg_cepces::chain::verify_signature(&intermediate, &root).is_ok());
        assert!(usg_cepces::chain::verify_signature(&leaf, &intermediate).is_ok());
        assert_eq!(
            usg_cepces::chain::ca_issuer_urls(&leaf).unwrap().unwrap(),
            ["http://127.0.0.1:1/pki/intermediate.crt"]
        );
    }
}
