use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BACKLOG: u32 = 10;
pub const DEFAULT_APP_FILE: &str = "app.yaml";

/// Command line: `rackhouse [ADDRESS] [PORT]`.
#[derive(Debug, Parser)]
#[command(name = "rackhouse", about = "Minimal one-request-per-connection HTTP/1.1 server")]
pub struct Cli {
    /// Address to bind.
    #[arg(default_value = DEFAULT_BIND_ADDRESS)]
    pub address: String,

    /// Port to listen on.
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    /// Pending-connection queue length passed to `listen`.
    pub backlog: u32,
    /// Entry-point file the application is built from.
    pub app_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            app_file: PathBuf::from(DEFAULT_APP_FILE),
        }
    }
}

impl Config {
    pub fn new(bind_address: impl Into<String>, port: u16) -> Self {
        Self {
            bind_address: bind_address.into(),
            port,
            ..Self::default()
        }
    }

    /// `address:port`, bracketing IPv6 literals.
    pub fn listen_addr(&self) -> String {
        if self.bind_address.contains(':') && !self.bind_address.starts_with('[') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self::new(cli.address, cli.port)
    }
}
