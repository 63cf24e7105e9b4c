use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tally_utils::{config::Config, disk_storage::DiskStorageInterface};

#[derive(Parser, Debug)]
#[command(name = "tally", bin_name = "tally", version)]
pub struct Cli {
    /// Config file, defaults to ~/.tally/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint, `{}` is replaced with the API key
    #[arg(long, global = true, env = "TALLY_RPC_URL")]
    pub rpc_url: Option<String>,

    #[arg(long, global = true, env = "TALLY_RPC_API_KEY", hide_env_values = true)]
    pub rpc_api_key: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Serve `GET /balances/{address}` over HTTP (default)
    Serve {
        #[arg(long, env = "TALLY_PORT")]
        port: Option<u16>,
    },

    /// Print the balances of ADDRESS once and exit
    Balances { address: String },
}

impl Cli {
    /// Config from disk with command line overrides applied.
    pub fn load_config(&self) -> tally_utils::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = rpc_url.clone();
        }
        if let Some(rpc_api_key) = &self.rpc_api_key {
            config.rpc_api_key = Some(rpc_api_key.clone());
        }
        if let Some(Commands::Serve { port: Some(port) }) = &self.cmd {
            config.port = *port;
        }

        Ok(config)
    }
}
