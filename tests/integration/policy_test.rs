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

//! Integration tests for XCEP policy discovery

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::fixtures::{ca, ca_uri, policies_response, policy, Pki};
use super::{MockCepServer, POLICY_PATH, SOAP_CONTENT_TYPE};
use usg_cepces::soap::{KerberosAuthentication, NegotiateTokenSource, Service, UsernamePassword};
use usg_cepces::xcep::PolicyService;
use usg_cepces::{AuthMethod, Authentication, CepcesClient, CepcesError, Configuration};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn sample_policies(mock: &MockCepServer) -> String {
    let pki = Pki::generate(&mock.url());
    let ces = mock.enrollment_url();
    policies_response(
        &[policy("Machine", &[0]), policy("User", &[0, 1])],
        &[
            ca(
                0,
                &pki.intermediate,
                &[
                    ca_uri(2, "https://kerberos.example.com/CES", 1, false),
                    ca_uri(1, &ces, 2, false),
                    ca_uri(1, "https://renew.example.com/CES", 1, true),
                ],
            ),
            ca(1, &pki.root, &[ca_uri(1, "https://backup.example.com/CES", 5, false)]),
        ],
    )
}

#[tokio::test]
async fn test_get_policies() {
    let mock = MockCepServer::start().await;
    mock.mock_policies(&sample_policies(&mock)).await;

    let service = PolicyService::new(Service::new(
        mock.policy_url().parse().expect("Valid URL"),
        reqwest::Client::new(),
        Authentication::Anonymous,
    ));
    let response = service.get_policies().await.expect("get_policies failed");

    assert_eq!(
        response.templates().unwrap().unwrap(),
        ["Machine", "User"]
    );
    let cas = response.cas().unwrap().unwrap();
    assert_eq!(cas.len(), 2);
    let pem = cas[0].certificate(response.document()).unwrap().unwrap();
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
}

#[tokio::test]
async fn test_client_endpoints_follow_auth_method() {
    let mock = MockCepServer::start().await;
    mock.mock_policies(&sample_policies(&mock)).await;

    let client = CepcesClient::new(mock.policy_config())
        .await
        .expect("Client creation failed");

    let endpoints = client.endpoints().unwrap().unwrap();
    let urls: Vec<String> = endpoints.iter().map(ToString::to_string).collect();
    assert_eq!(
        urls,
        [
            "https://renew.example.com/CES".to_string(),
            mock.enrollment_url(),
            "https://backup.example.com/CES".to_string(),
        ]
    );
    assert!(endpoints
        .iter()
        .all(|endpoint| endpoint.auth_method == AuthMethod::Anonymous));
    assert!(endpoints[0].renewal_only);
}

#[tokio::test]
async fn test_resolve_template() {
    let mock = MockCepServer::start().await;
    mock.mock_policies(&sample_policies(&mock)).await;

    let client = CepcesClient::new(mock.policy_config())
        .await
        .expect("Client creation failed");
    let policies = client.policies().expect("Policy endpoint");

    let endpoints = policies.resolve("Machine", AuthMethod::Anonymous).unwrap();
    assert_eq!(endpoints.len(), 2);
    assert!(endpoints
        .iter()
        .all(|e| e.url.as_str() != "https://backup.example.com/CES"));

    let endpoints = policies.resolve("User", AuthMethod::Anonymous).unwrap();
    assert_eq!(endpoints.len(), 3);

    let err = policies.resolve("Missing", AuthMethod::Anonymous).unwrap_err();
    assert!(matches!(err, CepcesError::Lookup(_)));
}

#[tokio::test]
async fn test_request_format() {
    let mock = MockCepServer::start().await;

    Mock::given(method("POST"))
        .and(path(POLICY_PATH))
        .and(header("Content-Type", SOAP_CONTENT_TYPE))
        .and(body_string_contains("GetPolicies"))
        .and(body_string_contains("urn:uuid:"))
        .and(body_string_contains(
            "http://schemas.microsoft.com/windows/pki/2009/01/enrollmentpolicy/IPolicy/GetPolicies",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(super::fixtures::envelope(
                    super::POLICY_RESPONSE_ACTION,
                    &policies_response(&[], &[]),
                ))
                .insert_header("Content-Type", SOAP_CONTENT_TYPE),
        )
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = CepcesClient::new(mock.policy_config())
        .await
        .expect("Client creation failed");
    assert_eq!(client.templates().unwrap().unwrap(), Vec::<String>::new());
}

#[tokio::test]
async fn test_username_token_is_sent() {
    let mock = MockCepServer::start().await;

    Mock::given(method("POST"))
        .and(path(POLICY_PATH))
        .and(body_string_contains("UsernameToken"))
        .and(body_string_contains(">alice<"))
        .and(body_string_contains(">hunter2<"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(super::fixtures::envelope(
                super::POLICY_RESPONSE_ACTION,
                &policies_response(&[], &[]),
            )),
        )
        .expect(1)
        .mount(mock.inner())
        .await;

    let config = Configuration::builder()
        .endpoint(mock.policy_url())
        .expect("Valid URL")
        .auth(Authentication::UsernamePassword(UsernamePassword::new(
            "alice", "hunter2",
        )))
        .build()
        .expect("Valid config");

    let client = CepcesClient::new(config)
        .await
        .expect("Client creation failed");
    assert!(client.endpoints().unwrap().unwrap().is_empty());
}

struct StaticNegotiate;

#[async_trait]
impl NegotiateTokenSource for StaticNegotiate {
    async fn token(&self, target: &Url, delegate: bool) -> usg_cepces::Result<Vec<u8>> {
        assert_eq!(target.path(), POLICY_PATH);
        assert!(delegate);
        Ok(b"spnego-token".to_vec())
    }
}

#[tokio::test]
async fn test_negotiate_header_is_sent() {
    let mock = MockCepServer::start().await;

    Mock::given(method("POST"))
        .and(path(POLICY_PATH))
        .and(header("Authorization", "Negotiate c3BuZWdvLXRva2Vu"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(super::fixtures::envelope(
                super::POLICY_RESPONSE_ACTION,
                &sample_policies(&mock),
            )),
        )
        .expect(1)
        .mount(mock.inner())
        .await;

    let config = Configuration::builder()
        .endpoint(mock.policy_url())
        .expect("Valid URL")
        .auth(Authentication::Kerberos(KerberosAuthentication::new(
            Arc::new(StaticNegotiate),
        )))
        .build()
        .expect("Valid config");

    let client = CepcesClient::new(config)
        .await
        .expect("Client creation failed");
    let endpoints = client.endpoints().unwrap().unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].url.as_str(), "https://kerberos.example.com/CES");
}

#[tokio::test]
async fn test_nil_cas_are_unknown() {
    let mock = MockCepServer::start().await;
    mock.mock_policies(&format!(
        "<GetPoliciesResponse xmlns=\"{}\" xmlns:xsi=\"{}\">\
         <response xsi:nil=\"true\"/><cAs xsi:nil=\"true\"/><oIDs xsi:nil=\"true\"/>\
         </GetPoliciesResponse>",
        usg_cepces::xml::ns::CEP,
        usg_cepces::xml::ns::XSI
    ))
    .await;

    let client = CepcesClient::new(mock.policy_config())
        .await
        .expect("Client creation failed");
    assert!(client.endpoints().unwrap().is_none());
    assert!(client.templates().unwrap().is_none());
    assert!(client.certificate_chain(0).await.unwrap().is_none());
    assert!(client
        .request(&super::fixtures::csr(), false, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_soap_fault() {
    let mock = MockCepServer::start().await;
    mock.mock_fault(POLICY_PATH, "The policy is unavailable.").await;

    let err = CepcesClient::new(mock.policy_config())
        .await
        .err()
        .expect("Fault expected");
    match &err {
        CepcesError::SoapFault {
            code,
            subcode,
            reason,
        } => {
            assert_eq!(code, "s:Receiver");
            assert_eq!(subcode.as_deref(), Some("a:InternalServiceFault"));
            assert_eq!(reason, "The policy is unavailable.");
        }
        other => panic!("Expected SoapFault, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "The policy is unavailable. (Code: s:Receiver; Subcode: a:InternalServiceFault)"
    );
}

#[tokio::test]
async fn test_http_errors() {
    let mock = MockCepServer::start().await;
    mock.mock_status(POLICY_PATH, 503, "").await;

    let err = CepcesClient::new(mock.policy_config())
        .await
        .err()
        .expect("Error expected");
    assert!(err.is_transport());
    assert!(matches!(
        err,
        CepcesError::Transport { status: 503, ref message } if message == "Service Unavailable"
    ));
}

#[tokio::test]
async fn test_internal_server_error_without_fault() {
    let mock = MockCepServer::start().await;
    mock.mock_status(POLICY_PATH, 500, "<html>oops</html>").await;

    let err = CepcesClient::new(mock.policy_config())
        .await
        .err()
        .expect("Error expected");
    assert!(matches!(err, CepcesError::Transport { status: 500, .. }));
}
