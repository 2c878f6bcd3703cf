use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use stakepool_core::pool::StakePool;
use stakepool_core::transfer::MemoryBank;

/// On-disk session: the pool plus the in-memory bank standing in for the
/// external asset-transfer collaborator.
#[derive(Serialize, Deserialize)]
struct PoolFile {
    pool: StakePool,
    bank: MemoryBank,
}

#[derive(Parser)]
#[command(
    name = "stakepool",
    about = "Reward-distribution ledger driven through a JSON state file"
)]
struct Cli {
    /// Path of the pool state file.
    #[arg(long, default_value = "pool.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh pool for the given reference asset.
    Init { asset: String },
    /// Mint units of an asset into a bank account.
    Fund {
        account: String,
        asset: String,
        amount: u64,
    },
    /// Deposit stake from an account.
    Stake { account: String, amount: u64 },
    /// Withdraw stake back to an account.
    Unstake { account: String, amount: u64 },
    /// Append a reward distribution funded by `from`.
    Distribute {
        from: String,
        asset: String,
        amount: u64,
    },
    /// Settle the listed distribution indices for an account.
    Claim {
        account: String,
        #[arg(value_delimiter = ',')]
        indices: Vec<u64>,
    },
    /// Print the pool snapshot as JSON.
    Show,
    /// Print the event log as JSON.
    Events,
}

fn load(path: &Path) -> Result<PoolFile, String> {
    let bytes =
        fs::read(path).map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| format!("cannot parse {}: {err}", path.display()))
}

fn store(path: &Path, file: &PoolFile) -> Result<(), String> {
    let encoded =
        serde_json::to_vec_pretty(file).map_err(|err| format!("cannot encode state: {err}"))?;
    fs::write(path, encoded).map_err(|err| format!("cannot write {}: {err}", path.display()))
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Init { asset } => {
            let file = PoolFile {
                pool: StakePool::new(&asset),
                bank: MemoryBank::new(),
            };
            store(&cli.state, &file)?;
            println!("Initialized {asset} pool → {}", cli.state.display());
        }
        Command::Fund {
            account,
            asset,
            amount,
        } => {
            let mut file = load(&cli.state)?;
            file.bank.mint(&account, &asset, amount);
            store(&cli.state, &file)?;
            println!(
                "Funded {account} with {amount} {asset} (now {})",
                file.bank.balance(&account, &asset)
            );
        }
        Command::Stake { account, amount } => {
            let mut file = load(&cli.state)?;
            file.pool
                .stake(&account, amount, &mut file.bank)
                .map_err(|err| err.to_string())?;
            store(&cli.state, &file)?;
            println!(
                "Staked {amount} for {account} (pool total {})",
                file.pool.ledger().total()
            );
        }
        Command::Unstake { account, amount } => {
            let mut file = load(&cli.state)?;
            file.pool
                .unstake(&account, amount, &mut file.bank)
                .map_err(|err| err.to_string())?;
            store(&cli.state, &file)?;
            println!(
                "Unstaked {amount} for {account} (pool total {})",
                file.pool.ledger().total()
            );
        }
        Command::Distribute {
            from,
            asset,
            amount,
        } => {
            let mut file = load(&cli.state)?;
            let index = file
                .pool
                .distribute(&from, &asset, amount, &mut file.bank)
                .map_err(|err| err.to_string())?;
            store(&cli.state, &file)?;
            println!("Distribution #{index}: {amount} {asset}");
        }
        Command::Claim { account, indices } => {
            let mut file = load(&cli.state)?;
            let paid = file
                .pool
                .claim_rewards(&account, &indices, &mut file.bank)
                .map_err(|err| err.to_string())?;
            store(&cli.state, &file)?;
            println!(
                "Settled for {account}: paid {paid} across {} requested indices",
                indices.len()
            );
        }
        Command::Show => {
            let file = load(&cli.state)?;
            let snapshot = file.pool.snapshot();
            let rendered = serde_json::to_string_pretty(&snapshot)
                .map_err(|err| format!("cannot encode snapshot: {err}"))?;
            println!("{rendered}");
        }
        Command::Events => {
            let file = load(&cli.state)?;
            let rendered = serde_json::to_string_pretty(file.pool.events())
                .map_err(|err| format!("cannot encode events: {err}"))?;
            println!("{rendered}");
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        process::exit(2);
    }
}
