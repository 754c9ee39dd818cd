// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::ProberError;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use monero_node_status_client::models::JobCapabilities;

pub(crate) mod run_probe;

#[derive(Parser, Debug)]
#[clap(author = "Nymtech", version, about)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

impl Cli {
    pub(crate) async fn execute(self) -> Result<(), ProberError> {
        match self.command {
            Commands::RunProbe(args) => {
                let config = args.into_config()?;
                run_probe::run_probe(&config).await.inspect_err(|err| {
                    if err.is_transient() {
                        tracing::warn!("Probe cycle failed, the next run may succeed: {err}");
                    } else {
                        tracing::error!("Probe cycle failed: {err}");
                    }
                })
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Pull one node from the server, probe it and report the result
    RunProbe(ProbeArgs),
}

#[derive(clap::Args, Debug)]
pub(crate) struct ProbeArgs {
    /// Base URL of the status server, e.g. https://status.example.com
    #[arg(long, env = "SERVER_ENDPOINT")]
    server_endpoint: Option<String>,

    /// Prober API key issued by the server operator
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Accept Tor (.onion) nodes
    #[arg(
        long,
        env = "ACCEPT_TOR",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    accept_tor: bool,

    /// Tor SOCKS5 proxy address, required with --accept-tor
    #[arg(long, env = "TOR_SOCKS")]
    tor_socks: Option<String>,

    /// Accept I2P (.i2p) nodes
    #[arg(
        long,
        env = "ACCEPT_I2P",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    accept_i2p: bool,

    /// I2P SOCKS5 proxy address, required with --accept-i2p
    #[arg(long, env = "I2P_SOCKS")]
    i2p_socks: Option<String>,

    /// Accept nodes only reachable over IPv6
    #[arg(
        long,
        env = "ACCEPT_IPV6",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    accept_ipv6: bool,

    /// Origin sent with RPC calls and expected back for CORS capability.
    /// Defaults to the server endpoint.
    #[arg(long, env = "PROBE_ORIGIN")]
    origin: Option<String>,
}

impl ProbeArgs {
    pub(crate) fn into_config(self) -> Result<ProberConfig, ProberError> {
        let server_endpoint = non_empty(self.server_endpoint)
            .ok_or_else(|| ProberError::config("SERVER_ENDPOINT is not set"))?;
        let api_key =
            non_empty(self.api_key).ok_or_else(|| ProberError::config("API_KEY is not set"))?;

        let tor_socks = non_empty(self.tor_socks);
        if self.accept_tor && tor_socks.is_none() {
            return Err(ProberError::config(
                "ACCEPT_TOR is enabled but TOR_SOCKS is not set",
            ));
        }
        let i2p_socks = non_empty(self.i2p_socks);
        if self.accept_i2p && i2p_socks.is_none() {
            return Err(ProberError::config(
                "ACCEPT_I2P is enabled but I2P_SOCKS is not set",
            ));
        }

        let origin = non_empty(self.origin)
            .unwrap_or_else(|| server_endpoint.trim_end_matches('/').to_string());

        Ok(ProberConfig {
            server_endpoint,
            api_key,
            tor_socks: tor_socks.filter(|_| self.accept_tor),
            i2p_socks: i2p_socks.filter(|_| self.accept_i2p),
            accept_ipv6: self.accept_ipv6,
            origin,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validated prober settings.
#[derive(Debug, Clone)]
pub(crate) struct ProberConfig {
    pub(crate) server_endpoint: String,
    pub(crate) api_key: String,
    pub(crate) tor_socks: Option<String>,
    pub(crate) i2p_socks: Option<String>,
    pub(crate) accept_ipv6: bool,
    pub(crate) origin: String,
}

impl ProberConfig {
    pub(crate) fn capabilities(&self) -> JobCapabilities {
        JobCapabilities {
            accept_tor: self.tor_socks.is_some(),
            accept_i2p: self.i2p_socks.is_some(),
            accept_ipv6: self.accept_ipv6,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args() -> ProbeArgs {
        ProbeArgs {
            server_endpoint: Some("https://status.example.com/".to_string()),
            api_key: Some("key".to_string()),
            accept_tor: false,
            tor_socks: None,
            accept_i2p: false,
            i2p_socks: None,
            accept_ipv6: false,
            origin: None,
        }
    }

    #[test]
    fn missing_endpoint_or_key_is_a_config_error() {
        let mut no_endpoint = args();
        no_endpoint.server_endpoint = Some("  ".to_string());
        assert!(matches!(
            no_endpoint.into_config(),
            Err(ProberError::Config { .. })
        ));

        let mut no_key = args();
        no_key.api_key = None;
        assert!(matches!(no_key.into_config(), Err(ProberError::Config { .. })));
    }

    #[test]
    fn tor_requires_socks_address() {
        let mut tor = args();
        tor.accept_tor = true;
        assert!(matches!(tor.into_config(), Err(ProberError::Config { .. })));

        let mut tor = args();
        tor.accept_tor = true;
        tor.tor_socks = Some("127.0.0.1:9050".to_string());
        let config = tor.into_config().unwrap();
        assert!(config.capabilities().accept_tor);
        assert!(!config.capabilities().accept_i2p);
    }

    #[test]
    fn socks_without_accept_flag_does_not_enable_transport() {
        let mut i2p = args();
        i2p.i2p_socks = Some("127.0.0.1:4447".to_string());
        let config = i2p.into_config().unwrap();
        assert!(config.i2p_socks.is_none());
        assert!(!config.capabilities().accept_i2p);
    }

    #[test]
    fn transport_flags_accept_numeric_env_values() {
        std::env::set_var("ACCEPT_TOR", "1");
        std::env::set_var("ACCEPT_I2P", "0");
        std::env::set_var("ACCEPT_IPV6", "t");
        let cli = Cli::try_parse_from(["monero-node-status-agent", "run-probe"]).unwrap();
        std::env::remove_var("ACCEPT_TOR");
        std::env::remove_var("ACCEPT_I2P");
        std::env::remove_var("ACCEPT_IPV6");

        let Commands::RunProbe(args) = cli.command;
        assert!(args.accept_tor);
        assert!(!args.accept_i2p);
        assert!(args.accept_ipv6);
    }

    #[test]
    fn transport_flags_work_bare_or_with_a_value() {
        let cli = Cli::try_parse_from([
            "monero-node-status-agent",
            "run-probe",
            "--accept-i2p",
            "--accept-ipv6=no",
        ])
        .unwrap();
        let Commands::RunProbe(args) = cli.command;
        assert!(args.accept_i2p);
        assert!(!args.accept_ipv6);
    }

    #[test]
    fn origin_defaults_to_server_endpoint() {
        let config = args().into_config().unwrap();
        assert_eq!(config.origin, "https://status.example.com");
    }
}
