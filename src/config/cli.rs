use crate::config::toml_config::ServiceConfig;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "ongkir-finder")]
#[command(about = "Nearest shipping agent and shipping cost lookup service")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "ongkir.toml")]
    pub config: String,

    /// Override server.bind_address from config
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Override server.port from config
    #[arg(long)]
    pub port: Option<u16>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliConfig {
    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&self, config: &mut ServiceConfig) {
        if let Some(bind_address) = &self.bind_address {
            config.server.bind_address = bind_address.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.verbose {
            config.logging.verbose = true;
        }
    }
}
