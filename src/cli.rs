//! Command-line argument parsing (§6, §10.1).

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, Protocol};
use crate::error::StartupError;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Injects user-defined options into IPv4/TCP/UDP headers diverted from an NFQUEUE hook"
)]
pub struct Cli {
    /// Target protocol.
    #[arg(short = 'p', long = "proto", value_enum)]
    pub proto: ProtoArg,

    /// Netfilter queue number to bind to.
    #[arg(short = 'q', long = "queue")]
    pub queue: u16,

    /// Target queue redirection (default: disabled, verdict is ACCEPT).
    #[arg(short = 'r', long = "redirect")]
    pub redirect: Option<u16>,

    /// Overwrite existing options instead of appending (default: append).
    #[arg(short = 'w', long = "overwrite")]
    pub overwrite: bool,

    /// Path to the recipe file (raw bytes, one option kind per byte).
    pub recipe_path: PathBuf,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum ProtoArg {
    Ip,
    Tcp,
    Udp,
}

impl Cli {
    pub fn into_config(self) -> Result<Config, StartupError> {
        if let Some(redirect) = self.redirect {
            if redirect == self.queue {
                return Err(StartupError::RedirectEqualsSource {
                    queue: self.queue,
                    redirect,
                });
            }
        }

        let protocol = match self.proto {
            ProtoArg::Ip => Protocol::Ipv4,
            ProtoArg::Tcp => Protocol::Tcp,
            ProtoArg::Udp => Protocol::Udp,
        };

        Ok(Config {
            protocol,
            queue: self.queue,
            redirect: self.redirect,
            overwrite: self.overwrite,
        })
    }
}
