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

//! MS-WSTEP certificate enrollment: issue and poll.

pub mod service;
pub mod types;

pub use service::{csr_body, curate, EnrollmentResponse, EnrollmentService, TokenStatus, ACTION};
pub use types::{
    RequestedToken, SecurityTokenReference, SecurityTokenRequest, SecurityTokenResponse,
    SecurityTokenResponseCollection,
};
