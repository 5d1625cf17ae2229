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

//! certmonger operations against mock servers

use super::fixtures::{ca, ca_uri, csr, issued, pending, policies_response, policy, Pki};
use super::{MockCepServer, ENROLLMENT_PATH};
use usg_cepces::certmonger::environment::{CA_COOKIE, CSR};
use usg_cepces::certmonger::{Cookie, Environment, Operation, ResultCode};
use usg_cepces::chain::parse_certificate;
use usg_cepces::{CepcesClient, CertificateService};

async fn run(op: Operation, env: &Environment, client: &CepcesClient) -> (ResultCode, String) {
    let mut out = Vec::new();
    let service: &dyn CertificateService = client;
    let code = op
        .execute(env, Some(service), &mut out)
        .await
        .expect("Operation failed");
    (code, String::from_utf8(out).expect("UTF-8 output"))
}

async fn policy_client(mock: &MockCepServer, pki: &Pki) -> CepcesClient {
    mock.mock_policies(&policies_response(
        &[policy("Machine", &[0]), policy("WebServer", &[0])],
        &[ca(0, &pki.intermediate, &[ca_uri(1, &mock.enrollment_url(), 1, false)])],
    ))
    .await;
    CepcesClient::new(mock.policy_config())
        .await
        .expect("Client creation failed")
}

#[tokio::test]
async fn test_submit_issued() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    let client = policy_client(&mock, &pki).await;
    mock.mock_issue(&issued(11, &pki.leaf)).await;

    let env: Environment = [(CSR, csr())].into_iter().collect();
    let (code, out) = run(Operation::Submit, &env, &client).await;

    assert_eq!(code, ResultCode::Issued);
    assert_eq!(
        parse_certificate(out.as_bytes()).unwrap(),
        parse_certificate(&pki.leaf).unwrap()
    );
}

#[tokio::test]
async fn test_submit_pending_then_poll() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    let client = policy_client(&mock, &pki).await;
    mock.mock_issue(&pending(77, &mock.enrollment_url())).await;
    mock.mock_query(&issued(77, &pki.leaf)).await;

    let env: Environment = [(CSR, csr())].into_iter().collect();
    let (code, out) = run(Operation::Submit, &env, &client).await;
    assert_eq!(code, ResultCode::WaitMore);
    assert_eq!(out, format!("3600\n77,{}\n", mock.enrollment_url()));

    // certmonger keeps the delay and hands back the second line
    let cookie: Cookie = out.trim_end().parse().unwrap();
    let (_, second_line) = out.trim_end().split_once('\n').unwrap();
    assert_eq!(cookie.request_id, 77);

    let env: Environment = [(CA_COOKIE, second_line)].into_iter().collect();
    let (code, out) = run(Operation::Poll, &env, &client).await;
    assert_eq!(code, ResultCode::Issued);
    assert!(out.starts_with("-----BEGIN CERTIFICATE-----"));
}

#[tokio::test]
async fn test_submit_rejected() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    let client = policy_client(&mock, &pki).await;
    mock.mock_fault(ENROLLMENT_PATH, "Denied by Policy Module").await;

    let env: Environment = [(CSR, csr())].into_iter().collect();
    let (code, out) = run(Operation::Submit, &env, &client).await;
    assert_eq!(code, ResultCode::Rejected);
    assert_eq!(
        out,
        "Denied by Policy Module (Code: s:Receiver; Subcode: a:InternalServiceFault)\n"
    );
}

#[tokio::test]
async fn test_submit_connect_error() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    let client = policy_client(&mock, &pki).await;
    mock.mock_status(ENROLLMENT_PATH, 503, "").await;

    let env: Environment = [(CSR, csr())].into_iter().collect();
    let (code, _) = run(Operation::Submit, &env, &client).await;
    assert_eq!(code, ResultCode::ConnectError);
}

#[tokio::test]
async fn test_templates_and_roots() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    pki.serve(&mock).await;
    let client = policy_client(&mock, &pki).await;
    let env = Environment::default();

    let (code, out) = run(Operation::GetSupportedTemplates, &env, &client).await;
    assert_eq!(code, ResultCode::DEFAULT);
    assert_eq!(out, "Machine\nWebServer\n");

    let (code, out) = run(Operation::FetchRoots, &env, &client).await;
    assert_eq!(code, ResultCode::DEFAULT);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "Example Root CA");
    assert_eq!(lines[1], "-----BEGIN CERTIFICATE-----");
    assert!(lines.contains(&"Example Issuing CA"));
}
