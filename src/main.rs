//! Dether Node
//!
//! Main entry point for running a Dether protocol node.

use clap::{Parser, Subcommand};
use dether_core::chain::Chain;
use dether_core::config::NodeConfig;
use dether_core::constants::DTH;
use dether_core::crypto::Address;
use dether_core::node::{create_genesis_block, genesis_state, GenesisInfo};
use dether_core::rpc::{start_rpc_server, RpcState};
use dether_core::storage::ChainDb;
use dether_core::wallet::{KeyPair, Wallet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(name = "dether-node")]
#[command(about = "Dether protocol node", version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "dether.toml")]
    config: PathBuf,

    /// Overrides `node.data_dir`
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Overrides `node.rpc_port`
    #[arg(long)]
    rpc_port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a signing key and print its address
    Keygen {
        /// Write the key to a wallet file as well
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

const ADMIN_KEY_FILE: &str = "admin.key";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Keygen { out }) = &cli.command {
        return keygen(out.as_deref());
    }

    let mut config = NodeConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.node.data_dir = dir;
    }
    if let Some(port) = cli.rpc_port {
        config.node.rpc_port = port;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.node.log_level.as_str())).init();

    std::fs::create_dir_all(&config.node.data_dir)?;
    let admin = resolve_admin(&config)?;

    let state = genesis_state(&config, admin)?;
    let genesis = create_genesis_block(&state, config.genesis.timestamp)?;
    let info = GenesisInfo::new(&genesis, &state, admin);

    let db = ChainDb::open(&config.node.data_dir)?;
    let chain = Chain::open(db, genesis, state)?;

    println!("Dether Node");
    println!("  Genesis:     {}", info.hash);
    println!("  Timestamp:   {}", info.timestamp);
    println!("  Admin:       {}", info.admin);
    println!("  Countries:   {}", info.countries);
    println!("  Minted:      {} DTH", info.minted / DTH);
    println!("  Height:      {}", chain.height());
    println!("  Tip:         {}", chain.tip_hash());
    println!();

    let chain = Arc::new(Mutex::new(chain));
    let rpc_state = Arc::new(RpcState::new(chain.clone()));
    let port = config.node.rpc_port;

    let rpc = tokio::spawn(async move {
        if let Err(e) = start_rpc_server(rpc_state, port).await {
            log::error!("RPC server stopped: {}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutting down");
        }
        _ = rpc => {
            log::warn!("RPC task exited");
        }
    }

    let height = chain.lock().map(|c| c.height()).unwrap_or_default();
    log::info!("stopped at height {}", height);
    Ok(())
}

/// Configured admin, or a key generated once and kept in the data directory
fn resolve_admin(config: &NodeConfig) -> Result<Address, Box<dyn std::error::Error>> {
    if let Some(admin) = config.admin_address()? {
        return Ok(admin);
    }

    let path = config.node.data_dir.join(ADMIN_KEY_FILE);
    if path.exists() {
        let keypair = KeyPair::from_hex(&std::fs::read_to_string(&path)?)?;
        log::info!("using admin key from {}", path.display());
        return Ok(keypair.address);
    }

    let keypair = KeyPair::generate();
    std::fs::write(&path, keypair.private_key_hex())?;
    log::warn!(
        "no admin configured, generated {} and saved its key to {}",
        keypair.address,
        path.display()
    );
    Ok(keypair.address)
}

fn keygen(out: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut wallet = match out {
        Some(path) if path.exists() => Wallet::load(path)?,
        _ => Wallet::new(),
    };
    let keypair = wallet.generate_key().clone();
    println!("Address:     {}", keypair.address);
    println!("Private key: {}", keypair.private_key_hex());

    if let Some(path) = out {
        wallet.save(path)?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}
