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

//! Integration tests for AIA chain resolution

use super::fixtures::{ca, ca_uri, policies_response, policy, Pki, INTERMEDIATE_PATH, ROOT_PATH};
use super::MockCepServer;
use usg_cepces::chain::{parse_certificate, subject_common_name};
use usg_cepces::{CepcesClient, CepcesError, Certificate, ChainResolver};

fn names(chain: &[Certificate]) -> Vec<String> {
    chain
        .iter()
        .map(|cert| subject_common_name(cert).unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_full_chain_is_root_first() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    pki.serve(&mock).await;

    let chain = ChainResolver::new(reqwest::Client::new())
        .resolve(&pki.leaf)
        .await
        .expect("Chain resolution failed");

    assert_eq!(
        names(&chain),
        ["Example Root CA", "Example Issuing CA", "host.example.com"]
    );
    assert_eq!(chain[0], parse_certificate(&pki.root).unwrap());
}

#[tokio::test]
async fn test_corrupted_intermediate_yields_leaf() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    mock.mock_certificate(ROOT_PATH, pki.root.clone()).await;
    mock.mock_certificate(INTERMEDIATE_PATH, pki.corrupted_intermediate())
        .await;

    let err = ChainResolver::new(reqwest::Client::new())
        .resolve(&pki.leaf)
        .await
        .unwrap_err();

    let partial = err.partial_result().expect("Partial chain expected");
    assert_eq!(names(partial), ["host.example.com"]);
}

#[tokio::test]
async fn test_missing_issuer_keeps_prefix() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    mock.mock_certificate(INTERMEDIATE_PATH, pki.intermediate.clone())
        .await;

    let err = ChainResolver::new(reqwest::Client::new())
        .resolve(&pki.leaf)
        .await
        .unwrap_err();

    match err {
        CepcesError::PartialChain { chain, .. } => {
            assert_eq!(names(&chain), ["host.example.com", "Example Issuing CA"]);
        }
        other => panic!("Expected PartialChain, got {:?}", other),
    }
}

#[tokio::test]
async fn test_policy_ca_chain() {
    let mock = MockCepServer::start().await;
    let pki = Pki::generate(&mock.url());
    pki.serve(&mock).await;
    mock.mock_policies(&policies_response(
        &[policy("Machine", &[0])],
        &[ca(0, &pki.intermediate, &[ca_uri(1, &mock.enrollment_url(), 1, false)])],
    ))
    .await;

    let client = CepcesClient::new(mock.policy_config())
        .await
        .expect("Client creation failed");
    let chain = client
        .certificate_chain(0)
        .await
        .expect("Chain resolution failed")
        .expect("CA certificate expected");
    assert_eq!(names(&chain), ["Example Root CA", "Example Issuing CA"]);

    assert!(client.certificate_chain(1).await.unwrap().is_none());
}
