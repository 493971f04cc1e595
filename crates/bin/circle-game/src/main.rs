//! circle-game - whitelist, signing and deployment tooling
//!
//! usage:
//!   circle-game whitelist --file members.txt --address 0x...   # root + proof
//!   circle-game sign-entry --key 0x... --game 0x... --x 40 --y 40
//!   circle-game deploy --config game.toml --authority 0x...
//!   circle-game simulate --scenario scenario.toml

mod scenario;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use circle_game::{format_hash, Address, EntrySigner, Game, GameConfig, InMemoryLedger, Position};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use whitelist_merkle::WhitelistTree;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "circle-game")]
#[command(about = "whitelisted positional game: roots, signatures, deployments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the whitelist root, and optionally one member's proof
    Whitelist {
        /// One address per line; blank lines and `#` comments are skipped
        #[arg(short, long)]
        file: PathBuf,

        /// Print the membership proof for this address
        #[arg(short, long)]
        address: Option<Address>,

        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Sign a gasless entry for a game instance
    SignEntry {
        /// secp256k1 secret key, hex
        #[arg(short, long, env = "CIRCLE_GAME_KEY", hide_env_values = true)]
        key: String,

        /// Game instance address
        #[arg(short, long)]
        game: Address,

        #[arg(short, long)]
        x: u32,

        #[arg(short, long)]
        y: u32,
    },

    /// Validate a game config and print the resulting deployment
    Deploy {
        #[arg(short, long)]
        config: PathBuf,

        /// Overrides the config's authority
        #[arg(short, long, env = "ADMIN_ADDRESS")]
        authority: Option<Address>,
    },

    /// Run a scripted game end to end over an in-memory ledger
    Simulate {
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("circle_game=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Whitelist { file, address, json } => whitelist(&file, address, json),
        Command::SignEntry { key, game, x, y } => sign_entry(&key, game, Position::new(x, y)),
        Command::Deploy { config, authority } => deploy(&config, authority),
        Command::Simulate { scenario } => simulate(&scenario),
    }
}

fn read_addresses(path: &Path) -> Result<Vec<Address>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    text.lines()
        .enumerate()
        .map(|(i, line)| (i, line.split('#').next().unwrap_or("").trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(i, line)| {
            line.parse::<Address>()
                .with_context(|| format!("{}:{}: bad address", path.display(), i + 1))
        })
        .collect()
}

fn whitelist(file: &Path, address: Option<Address>, json: bool) -> Result<()> {
    let members = read_addresses(file)?;
    let tree = WhitelistTree::new(&members);
    let root = tree.root().context("whitelist file has no addresses")?;
    info!(members = tree.len(), depth = tree.depth(), "whitelist built");

    let proof = match address {
        Some(address) => Some(
            tree.membership_proof(address.as_bytes())
                .with_context(|| format!("{address} is not in the whitelist"))?,
        ),
        None => None,
    };

    if json {
        let out = serde_json::json!({
            "root": format_hash(&root),
            "members": tree.len(),
            "address": address,
            "proof": proof,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("root:    {}", format_hash(&root));
    println!("members: {}", tree.len());
    if let (Some(address), Some(proof)) = (address, proof) {
        println!("proof for {address}:");
        for sibling in proof.siblings_hex() {
            println!("  {sibling}");
        }
    }
    Ok(())
}

fn sign_entry(key: &str, game: Address, position: Position) -> Result<()> {
    let signer = EntrySigner::from_hex(key).context("invalid signing key")?;
    let digest = circle_game::entry_digest(&position, &game);
    let signature = signer.sign_digest(&digest)?;

    println!("signer:    {}", signer.address());
    println!("position:  {position}");
    println!("digest:    {}", format_hash(&digest));
    println!("signature: 0x{}", hex::encode(signature));
    Ok(())
}

fn deploy(path: &Path, authority: Option<Address>) -> Result<()> {
    let mut config = GameConfig::load(path)?;
    if let Some(authority) = authority {
        config = config.with_authority(authority);
    }
    if config.authority.is_none() {
        bail!("no authority: set it in the config, pass --authority or export ADMIN_ADDRESS");
    }

    let ledger = Arc::new(InMemoryLedger::new(config.token));
    let game = Game::from_config(&config, ledger)
        .with_context(|| format!("invalid deployment in {}", path.display()))?;

    let limits = game.limits();
    println!("game:       {}", game.address());
    println!("authority:  {}", game.authority());
    println!("token:      {}", game.token());
    println!("root:       {}", format_hash(&game.whitelist_root()));
    println!("payout:     {}", game.payout_amount());
    println!("policy:     {:?}", game.payout_policy());
    println!("limits:     axis <= {}, radius <= {}", limits.max_axis, limits.max_radius);
    Ok(())
}

fn simulate(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let outcome = Scenario::from_toml_str(&text)?.run()?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
