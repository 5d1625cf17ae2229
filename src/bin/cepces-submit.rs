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

//! certmonger CA helper
//!
//! Registered with certmonger as an external CA helper. The operation and its
//! inputs arrive in `CERTMONGER_*` environment variables; the outcome is
//! printed on stdout and reported through the exit status.
//!
//! # Usage
//!
//! ```text
//! cepces-submit --server <URL> [OPTIONS]
//!
//! Options:
//!   -s, --server <URL>           Policy or enrollment endpoint
//!   -t, --type <TYPE>            Endpoint type (Policy, Enrollment)
//!   -a, --auth <METHOD>          Anonymous, UsernamePassword or Certificate
//!       --cas <PATH>             CA bundle; empty disables verification
//!       --poll-interval <SECS>   Delay reported for pending requests
//!       --timeout <SECS>         HTTP timeout
//!       --cert <PATH>            Client certificate (Certificate auth)
//!       --key <PATH>             Client key (Certificate auth)
//!       --no-delegate            Do not delegate Kerberos credentials
//!   -u, --username <USER>        Username (UsernamePassword auth)
//!       --password <PASSWORD>    Password, or CEPCES_PASSWORD
//!   -v, --verbose                Enable debug logging on stderr
//! ```
//!
//! # Example
//!
//! ```bash
//! getcert add-ca -c cepces -e \
//!     '/usr/libexec/cepces-submit --server=https://ca.example.com/CEP --auth=Certificate \
//!      --cert=/etc/pki/host.pem --key=/etc/pki/host.key'
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use usg_cepces::certmonger::operation::failure;
use usg_cepces::certmonger::{Environment, Operation, ResultCode};
use usg_cepces::soap::{AuthMethod, Authentication, UsernamePassword};
use usg_cepces::{
    CepcesClient, CepcesError, CertificateService, ClientIdentity, Configuration, EndpointType,
    TrustAnchors,
};

/// certmonger helper for MS-XCEP/MS-WSTEP enrollment
#[derive(Parser)]
#[command(name = "cepces-submit")]
#[command(author = "U.S. Federal Government")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "certmonger CA helper for MS-XCEP/MS-WSTEP enrollment", long_about = None)]
struct Cli {
    /// Policy or enrollment endpoint URL
    #[arg(short, long, env = "CEPCES_SERVER", value_name = "URL")]
    server: String,

    /// Endpoint type (Policy, Enrollment)
    #[arg(short = 't', long = "type", default_value = "Policy")]
    endpoint_type: String,

    /// Authentication method (Anonymous, UsernamePassword, Certificate)
    #[arg(short, long, default_value = "Anonymous", value_name = "METHOD")]
    auth: String,

    /// CA bundle for server verification; an empty value disables it
    #[arg(long, value_name = "PATH")]
    cas: Option<String>,

    /// Seconds certmonger waits before polling a pending request
    #[arg(long, default_value_t = usg_cepces::config::DEFAULT_POLL_INTERVAL, value_name = "SECS")]
    poll_interval: u64,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Client certificate (PEM)
    #[arg(long, value_name = "PATH")]
    cert: Option<PathBuf>,

    /// Client private key (PEM)
    #[arg(long, value_name = "PATH")]
    key: Option<PathBuf>,

    /// Do not delegate Kerberos credentials to the service
    #[arg(long)]
    no_delegate: bool,

    /// Username
    #[arg(short, long)]
    username: Option<String>,

    /// Password
    #[arg(long, env = "CEPCES_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout belongs to certmonger
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let env = Environment::from_process();
    let Some(name) = env.operation() else {
        error!("CERTMONGER_OPERATION is not set");
        return ResultCode::Underconfigured.into();
    };
    let Some(operation) = Operation::from_name(name) else {
        warn!("Unsupported operation: {}", name);
        return ResultCode::Unsupported.into();
    };
    if let Err(e) = operation.check(&env) {
        error!("{}", e);
        return ResultCode::Underconfigured.into();
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create async runtime: {}", e);
            return ResultCode::Underconfigured.into();
        }
    };

    let mut out = Vec::new();
    let code = runtime.block_on(run(&cli, operation, &env, &mut out));

    let mut stdout = std::io::stdout();
    if let Err(e) = stdout.write_all(&out).and_then(|()| stdout.flush()) {
        error!("Failed to write output: {}", e);
    }
    code.into()
}

async fn run(cli: &Cli, operation: Operation, env: &Environment, out: &mut Vec<u8>) -> ResultCode {
    let client = if operation.needs_service() {
        match connect(cli).await {
            Ok(client) => Some(client),
            Err(e) => match operation {
                Operation::Submit | Operation::Poll => return report_failure(&e, out),
                _ => {
                    warn!("No service available: {}", e);
                    None
                }
            },
        }
    } else {
        None
    };

    let service = client
        .as_ref()
        .map(|client| client as &dyn CertificateService);
    match operation.execute(env, service, out).await {
        Ok(code) => code,
        Err(e) => report_failure(&e, out),
    }
}

fn report_failure(err: &CepcesError, out: &mut Vec<u8>) -> ResultCode {
    failure(err, out).unwrap_or(ResultCode::Rejected)
}

async fn connect(cli: &Cli) -> Result<CepcesClient, CepcesError> {
    CepcesClient::new(configuration(cli)?).await
}

fn configuration(cli: &Cli) -> Result<Configuration, CepcesError> {
    let endpoint_type: EndpointType = cli.endpoint_type.parse()?;
    let trust_anchors = cli
        .cas
        .as_deref()
        .map_or(TrustAnchors::WebPki, TrustAnchors::from_cas_setting);

    Configuration::builder()
        .endpoint(&cli.server)?
        .endpoint_type(endpoint_type)
        .trust_anchors(trust_anchors)
        .auth(authentication(cli)?)
        .poll_interval(cli.poll_interval)
        .timeout(Duration::from_secs(cli.timeout))
        .build()
        .map_err(CepcesError::config)
}

fn authentication(cli: &Cli) -> Result<Authentication, CepcesError> {
    match AuthMethod::from_name(&cli.auth)? {
        AuthMethod::Anonymous => Ok(Authentication::Anonymous),
        AuthMethod::Kerberos => kerberos(cli),
        AuthMethod::UsernamePassword => {
            let (Some(username), Some(password)) = (&cli.username, &cli.password) else {
                return Err(CepcesError::config(
                    "UsernamePassword authentication needs --username and --password",
                ));
            };
            Ok(Authentication::UsernamePassword(UsernamePassword::new(
                username.as_str(),
                password.as_str(),
            )))
        }
        AuthMethod::Certificate => {
            let (Some(cert), Some(key)) = (&cli.cert, &cli.key) else {
                return Err(CepcesError::config(
                    "Certificate authentication needs --cert and --key",
                ));
            };
            let identity = ClientIdentity::from_files(cert, key).map_err(|e| {
                CepcesError::config(format!("Cannot read client identity: {}", e))
            })?;
            Ok(Authentication::Certificate(identity))
        }
    }
}

#[cfg(feature = "kerberos")]
fn kerberos(cli: &Cli) -> Result<Authentication, CepcesError> {
    use std::sync::Arc;
    use usg_cepces::soap::{GssapiTokenSource, KerberosAuthentication};

    let source = Arc::new(GssapiTokenSource::new());
    Ok(Authentication::Kerberos(
        KerberosAuthentication::new(source).delegate(!cli.no_delegate),
    ))
}

#[cfg(not(feature = "kerberos"))]
fn kerberos(_cli: &Cli) -> Result<Authentication, CepcesError> {
    Err(CepcesError::config(
        "Kerberos authentication requires building with the `kerberos` feature",
    ))
}
