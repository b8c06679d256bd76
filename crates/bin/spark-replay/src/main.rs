use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spark_state::{Block, Network, SparkLedger, SparkParams, SparkTxInfo, Transaction};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "spark-replay")]
#[command(about = "replay blocks through the spark ledger", long_about = None)]
struct Args {
    /// network preset for consensus parameters
    #[arg(long, env = "SPARK_NETWORK", default_value = "regtest")]
    network: Network,

    /// json file with consensus parameters, overrides --network
    #[arg(long, env = "SPARK_PARAMS")]
    params: Option<PathBuf>,

    /// json file with the blocks to connect, in height order
    #[arg(long, env = "SPARK_BLOCKS")]
    blocks: PathBuf,

    /// json file with transactions to offer the mempool after replay
    #[arg(long, env = "SPARK_MEMPOOL")]
    mempool: Option<PathBuf>,

    /// log rejected blocks and continue instead of stopping
    #[arg(long)]
    keep_going: bool,

    /// disconnect every block again and check the ledger ends empty
    #[arg(long)]
    unwind: bool,
}

#[derive(Serialize)]
struct GroupSummary {
    id: u32,
    n_coins: usize,
    first_block: Option<u32>,
    last_block: Option<u32>,
}

#[derive(Serialize)]
struct Summary {
    network: Network,
    tip_height: Option<u32>,
    blocks_connected: usize,
    blocks_rejected: usize,
    total_coins: usize,
    spent_tags: usize,
    latest_group: u32,
    groups: Vec<GroupSummary>,
    mempool_accepted: usize,
    mempool_rejected: usize,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn load_params(args: &Args) -> Result<SparkParams> {
    let params = match &args.params {
        Some(path) => read_json(path)?,
        None => SparkParams::for_network(args.network),
    };
    params
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid spark parameters")?;
    Ok(params)
}

fn replay(ledger: &SparkLedger, blocks: &[Block], keep_going: bool) -> Result<(Vec<(u32, SparkTxInfo)>, usize)> {
    let mut connected = Vec::with_capacity(blocks.len());
    let mut rejected = 0;
    for block in blocks {
        match ledger.connect_block(block) {
            Ok(info) => connected.push((block.height, info)),
            Err(e) if keep_going => {
                warn!(height = block.height, "block rejected: {}", e);
                rejected += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("connecting block at height {}", block.height))
            }
        }
    }
    Ok((connected, rejected))
}

fn offer_mempool(ledger: &SparkLedger, txs: &[Transaction]) -> (usize, usize) {
    let mut accepted = 0;
    let mut rejected = 0;
    for tx in txs {
        match ledger.accept_to_mempool(tx) {
            Ok(hash) => {
                info!(%hash, "accepted to mempool");
                accepted += 1;
            }
            Err(e) => {
                warn!(hash = %tx.txid(), "mempool rejected: {}", e);
                rejected += 1;
            }
        }
    }
    (accepted, rejected)
}

fn summarize(ledger: &SparkLedger, connected: usize, rejected: usize, mempool: (usize, usize)) -> Result<Summary> {
    let state = ledger.read()?;
    let mut groups: Vec<GroupSummary> = state
        .coin_groups()
        .iter()
        .map(|(id, g)| GroupSummary {
            id: *id,
            n_coins: g.n_coins,
            first_block: g.first_block,
            last_block: g.last_block,
        })
        .collect();
    groups.sort_by_key(|g| g.id);

    Ok(Summary {
        network: state.params().network,
        tip_height: state.last_height(),
        blocks_connected: connected,
        blocks_rejected: rejected,
        total_coins: state.total_coins(),
        spent_tags: state.spends().len(),
        latest_group: state.latest_coin_id(),
        groups,
        mempool_accepted: mempool.0,
        mempool_rejected: mempool.1,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spark_replay=info,spark_state=info".into()),
        )
        .init();

    let args = Args::parse();
    let params = load_params(&args)?;
    info!(
        network = %params.network,
        spark_start = params.spark_start_block,
        schnorr_fixes = params.schnorr_fixes_start_block,
        "starting spark replay"
    );

    let blocks: Vec<Block> = read_json(&args.blocks)?;
    info!("loaded {} blocks from {}", blocks.len(), args.blocks.display());

    let ledger = SparkLedger::new(params);
    let (connected, rejected) = replay(&ledger, &blocks, args.keep_going)?;

    let mempool = match &args.mempool {
        Some(path) => {
            let txs: Vec<Transaction> = read_json(path)?;
            offer_mempool(&ledger, &txs)
        }
        None => (0, 0),
    };

    let summary = summarize(&ledger, connected.len(), rejected, mempool)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if args.unwind {
        for (height, info) in connected.iter().rev() {
            ledger.disconnect_block(*height, info)?;
        }
        let state = ledger.read()?;
        ensure!(
            state.total_coins() == 0 && state.spends().is_empty(),
            "ledger not empty after unwind: {} coins, {} tags",
            state.total_coins(),
            state.spends().len()
        );
        info!("unwound {} blocks", connected.len());
    }

    Ok(())
}
