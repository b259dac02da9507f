use clap::Parser;
use tracing::info;

use testnet_bootstrap::client::{FriendbotClient, HorizonClient};
use testnet_bootstrap::{AccountRegistry, BootstrapConfig, BootstrapError, Provisioner};

#[derive(Parser)]
#[command(name = "testnet-bootstrap")]
#[command(about = "Provision token accounts on the Stellar testnet", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "bootstrap.toml")]
    config: String,
    /// Override the secrets file from the config
    #[arg(long)]
    input: Option<String>,
    /// Skip the friendbot activation stage (useful on reruns)
    #[arg(long)]
    skip_activation: bool,
}

fn main() -> Result<(), BootstrapError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = BootstrapConfig::load_or_default(&cli.config);
    if let Some(input) = cli.input {
        config.input_file = input;
    }

    let registry = AccountRegistry::load_from_file(&config.input_file)?;
    info!(
        "loaded {} accounts from {}",
        registry.len(),
        config.input_file
    );

    let horizon = HorizonClient::new(config.horizon_url.clone());
    let faucet = FriendbotClient::new(config.friendbot_url.clone());

    let provisioner = Provisioner::new(&config, &horizon, &faucet);
    let report = provisioner.run(&registry, cli.skip_activation)?;
    report.log_summary();

    Ok(())
}
