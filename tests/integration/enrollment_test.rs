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

//! Integration tests for WSTEP enrollment and polling

use super::fixtures::{ca, ca_uri, csr, issued, pending, policies_response, policy, Pki};
use super::{MockCepServer, ENROLLMENT_PATH};
use usg_cepces::chain::parse_certificate;
use usg_cepces::{CepcesClient, CepcesError, EnrollmentStatus};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_direct_enrollment_issued() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    mock.mock_issue(&issued(7, &pki.leaf)).await;

    let client = CepcesClient::new(mock.enrollment_config())
        .await
        .expect("Client creation failed");
    let result = client
        .request(&csr(), false, None)
        .await
        .expect("request failed")
        .expect("No result");

    assert_eq!(result.request_id, Some(7));
    assert!(!result.is_pending());
    assert_eq!(
        result.certificate(),
        Some(&parse_certificate(&pki.leaf).unwrap())
    );
}

#[tokio::test]
async fn test_issue_request_format() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    let csr = csr();
    let body = csr
        .lines()
        .nth(1)
        .expect("CSR has a body")
        .to_string();

    Mock::given(method("POST"))
        .and(path(ENROLLMENT_PATH))
        .and(body_string_contains("RequestSecurityToken"))
        .and(body_string_contains(
            "http://docs.oasis-open.org/ws-sx/ws-trust/200512/Issue",
        ))
        .and(body_string_contains(
            "http://schemas.microsoft.com/windows/pki/2009/01/enrollment#PKCS10",
        ))
        .and(body_string_contains(body.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(super::fixtures::envelope(
            super::ENROLLMENT_RESPONSE_ACTION,
            &super::fixtures::response_collection(&issued(1, &pki.leaf)),
        )))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = CepcesClient::new(mock.enrollment_config())
        .await
        .expect("Client creation failed");
    assert!(client.request(&csr, false, None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_pending_then_poll() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    mock.mock_issue(&pending(42, &mock.enrollment_url())).await;
    mock.mock_query(&issued(42, &pki.leaf)).await;

    let client = CepcesClient::new(mock.enrollment_config())
        .await
        .expect("Client creation failed");

    let result = client
        .request(&csr(), false, None)
        .await
        .expect("request failed")
        .expect("No result");
    assert!(result.is_pending());
    assert_eq!(result.request_id, Some(42));
    let reference = result.reference().expect("Pending reference").to_string();
    assert_eq!(reference, mock.enrollment_url());

    let result = client
        .poll(42, &reference)
        .await
        .expect("poll failed")
        .expect("No result");
    match result.status {
        EnrollmentStatus::Issued(certificate) => {
            assert_eq!(*certificate, parse_certificate(&pki.leaf).unwrap());
        }
        EnrollmentStatus::Pending(_) => panic!("Expected Issued, got Pending"),
    }
}

#[tokio::test]
async fn test_poll_sends_request_id() {
    let mock = MockCepServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENROLLMENT_PATH))
        .and(body_string_contains(
            "http://docs.oasis-open.org/ws-sx/ws-trust/200512/Query",
        ))
        .and(body_string_contains("RequestID>1234<"))
        .respond_with(ResponseTemplate::new(200).set_body_string(super::fixtures::envelope(
            super::ENROLLMENT_RESPONSE_ACTION,
            &super::fixtures::response_collection(&pending(1234, &mock.enrollment_url())),
        )))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = CepcesClient::new(mock.enrollment_config())
        .await
        .expect("Client creation failed");
    let result = client
        .poll(1234, &mock.enrollment_url())
        .await
        .expect("poll failed")
        .expect("No result");
    assert!(result.is_pending());
}

#[tokio::test]
async fn test_enrollment_through_policy() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    mock.mock_policies(&policies_response(
        &[policy("Machine", &[0])],
        &[ca(
            0,
            &pki.intermediate,
            &[
                ca_uri(1, "https://unreachable.example.com/CES", 9, false),
                ca_uri(1, &mock.enrollment_url(), 1, false),
            ],
        )],
    ))
    .await;
    mock.mock_issue(&issued(3, &pki.leaf)).await;

    let client = CepcesClient::new(mock.policy_config())
        .await
        .expect("Client creation failed");
    let result = client
        .request(&csr(), false, Some("Machine"))
        .await
        .expect("request failed")
        .expect("No result");
    assert_eq!(result.request_id, Some(3));
    assert!(result.certificate().is_some());

    let err = client
        .request(&csr(), false, Some("User"))
        .await
        .unwrap_err();
    assert!(matches!(err, CepcesError::Lookup(_)));
}

#[tokio::test]
async fn test_renewal_only_endpoints() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    mock.mock_policies(&policies_response(
        &[policy("Machine", &[0])],
        &[ca(0, &pki.intermediate, &[ca_uri(1, &mock.enrollment_url(), 1, true)])],
    ))
    .await;
    mock.mock_issue(&issued(9, &pki.leaf)).await;

    let client = CepcesClient::new(mock.policy_config())
        .await
        .expect("Client creation failed");

    assert!(client.request(&csr(), false, None).await.unwrap().is_none());
    let result = client
        .request(&csr(), true, None)
        .await
        .expect("request failed")
        .expect("No result");
    assert_eq!(result.request_id, Some(9));
}

#[tokio::test]
async fn test_enrollment_fault() {
    let mock = MockCepServer::start().await;
    mock.mock_fault(ENROLLMENT_PATH, "Denied by Policy Module").await;

    let client = CepcesClient::new(mock.enrollment_config())
        .await
        .expect("Client creation failed");
    let err = client.request(&csr(), false, None).await.unwrap_err();
    assert!(matches!(err, CepcesError::SoapFault { .. }));
    assert!(err.to_string().starts_with("Denied by Policy Module (Code: s:Receiver"));
}

#[tokio::test]
async fn test_invalid_csr_is_not_sent() {
    let mock = MockCepServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(mock.inner())
        .await;

    let client = CepcesClient::new(mock.enrollment_config())
        .await
        .expect("Client creation failed");
    let err = client
        .request("-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----", false, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Lookup error: Invalid CSR.");
}
