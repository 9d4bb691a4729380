use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use terminal_checkout::amount::{format_amount, parse_amount};
use terminal_checkout::config::Config;
use terminal_checkout::console;
use terminal_checkout::logging::{init_tracing, LogMode};
use terminal_checkout::processor::ProcessorClient;
use terminal_checkout::relay::RelayServer;
use terminal_checkout::terminal::{
    DeviceActions, LineItem, ReaderDisplayParams, ReaderListParams, RelayClient,
};
use terminal_checkout::workflow::{Session, SessionOptions};

#[derive(Parser, Debug)]
#[command(name = "terminal-checkout", version, about = "Collect card-present payments on a terminal reader")]
struct Cli {
    /// Config file (default: <config dir>/terminal-checkout/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an interactive checkout session
    Checkout {
        /// Starting amount, e.g. 12.50
        #[arg(long)]
        amount: Option<String>,
    },
    /// List online readers
    Readers,
    /// Show a one-line cart on a reader
    Display {
        #[arg(long)]
        reader: String,
        #[arg(long)]
        description: String,
        /// Line amount, e.g. 4.99
        #[arg(long)]
        amount: String,
    },
    /// Run the relay service in front of the processor's terminal API
    Relay {
        /// Overrides [relay].bind_addr
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mode = match cli.command {
        Command::Relay { .. } => LogMode::Relay,
        _ => LogMode::Console,
    };
    init_tracing(mode);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Checkout { amount } => checkout(config, amount.as_deref()).await,
        Command::Readers => readers(&config).await,
        Command::Display {
            reader,
            description,
            amount,
        } => display(&config, &reader, &description, &amount).await,
        Command::Relay { bind } => relay(&config, bind.as_deref()).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    Ok(config)
}

async fn checkout(mut config: Config, amount: Option<&str>) -> Result<()> {
    if config.session.user_id.is_empty() || config.session.account_id.is_empty() {
        bail!("[session] user_id and account_id must be set to start a checkout");
    }
    if let Some(amount) = amount {
        config.checkout.default_amount = parse_amount(amount)?;
    }

    let devices = Arc::new(RelayClient::from_config(&config));
    let gateway = Arc::new(
        ProcessorClient::from_config(&config.processor, &config.checkout)
            .context("Intent creation needs a processor key")?,
    );

    let session = Session::spawn(devices, gateway, SessionOptions::from_config(&config));
    let input = BufReader::new(tokio::io::stdin());
    let result = console::run(&session, input, tokio::io::stdout()).await;
    session.shutdown().await;
    result.context("Console I/O failed")
}

async fn readers(config: &Config) -> Result<()> {
    let client = RelayClient::from_config(config);
    let readers = client
        .list_readers(&ReaderListParams::online(config.checkout.reader_limit))
        .await?;
    println!("{}", console::render_readers(&readers, None));
    Ok(())
}

async fn display(config: &Config, reader: &str, description: &str, amount: &str) -> Result<()> {
    let minor = parse_amount(amount)?;
    let params = ReaderDisplayParams::cart(
        &config.checkout.currency,
        vec![LineItem {
            description: description.to_string(),
            amount: minor,
            quantity: 1,
        }],
        None,
    );

    RelayClient::from_config(config)
        .set_display(reader, &params)
        .await?;
    println!(
        "Showing {} ({} {}) on {}",
        description,
        format_amount(minor),
        config.checkout.currency.to_uppercase(),
        reader
    );
    Ok(())
}

async fn relay(config: &Config, bind: Option<&str>) -> Result<()> {
    let processor = ProcessorClient::from_config(&config.processor, &config.checkout)
        .context("The relay needs a processor key")?;

    let mut server = RelayServer::new(Arc::new(processor));
    let bind_addr = bind.unwrap_or(&config.relay.bind_addr);
    server.bind(bind_addr).await?;
    server.run().await?;
    Ok(())
}
