use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use hdwallet_explorer::{
    validate_mnemonic, EntropySource, FixedEntropy, Network, OsEntropy, ScriptVariant, Session,
    SessionConfig, SessionKind, StepRecord,
};
use tracing_subscriber::EnvFilter;

/// Step through BIP-39/BIP-32 wallet derivation
#[derive(Debug, Parser)]
#[command(name = "hdwallet-explorer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new Ethereum wallet step by step
    Create(FlowArgs),
    /// Derive the Ethereum wallet of an existing mnemonic
    Import {
        #[command(flatten)]
        common: CommonArgs,
        /// The mnemonic words
        #[arg(required = true, num_args = 1..)]
        phrase: Vec<String>,
    },
    /// Derive Bitcoin addresses of every script variant step by step
    Bitcoin {
        #[command(flatten)]
        flow: FlowArgs,
        /// Script variant whose path the address key is derived on
        #[arg(long, default_value = "legacy")]
        variant: ScriptVariant,
    },
    /// Check a mnemonic's word count, words and checksum
    Validate {
        #[arg(required = true, num_args = 1..)]
        phrase: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Address index (last path segment)
    #[arg(long, default_value_t = 0)]
    index: u32,
    /// Optional BIP-39 passphrase
    #[arg(long, default_value = "")]
    passphrase: String,
    /// bitcoin or testnet
    #[arg(long, default_value = "bitcoin")]
    network: Network,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct FlowArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Replay with fixed 16-byte hex entropy instead of fresh randomness
    #[arg(long)]
    entropy: Option<String>,
    /// Address index to switch to after the last step, showing the recomputation
    #[arg(long)]
    then_index: Option<u32>,
}

impl CommonArgs {
    fn config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_network(self.network)
            .with_passphrase(self.passphrase.clone())
            .with_address_index(self.index)
    }
}

fn entropy_source(hex: Option<&str>) -> Result<Box<dyn EntropySource>> {
    Ok(match hex {
        Some(hex) => Box::new(FixedEntropy::from_hex(hex).context("parsing --entropy")?),
        None => Box::new(OsEntropy),
    })
}

fn print_records(records: &[StepRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    for record in records {
        println!("{}. {}", record.index + 1, record.title);
        println!("   {}", record.description);
        if let Some(payload) = &record.payload {
            println!("{}", payload);
        }
        println!();
    }
    Ok(())
}

fn run_flow(kind: SessionKind, flow: &FlowArgs, config: SessionConfig) -> Result<Session> {
    let mut session =
        Session::with_entropy_source(kind, config, entropy_source(flow.entropy.as_deref())?)?;
    session.run_to_end().context("running derivation steps")?;
    if let Some(index) = flow.then_index {
        session
            .set_address_index(index)
            .context("changing address index")?;
    }
    print_records(&session.records(), flow.common.json)?;
    Ok(session)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Create(flow) => {
            let session = run_flow(SessionKind::EthereumCreate, &flow, flow.common.config())?;
            let wallet = session.finalize()?;
            if !flow.common.json {
                println!("Wallet ready: {}", wallet.address);
            }
        }
        Command::Import { common, phrase } => {
            let mut session = Session::new(SessionKind::EthereumImport, common.config())?;
            let wallet = session
                .import(&phrase.join(" "))
                .context("importing mnemonic")?;
            if common.json {
                println!("{}", serde_json::to_string_pretty(&wallet)?);
            } else {
                println!("Address: {}", wallet.address);
                println!("Public Key: {}", wallet.public_key_hex);
                println!("Derivation Path: {}", wallet.derivation_path);
            }
        }
        Command::Bitcoin { flow, variant } => {
            let config = flow.common.config().with_script_variant(variant);
            run_flow(SessionKind::BitcoinExplore, &flow, config)?;
        }
        Command::Validate { phrase } => {
            if !validate_mnemonic(&phrase.join(" ")) {
                bail!("invalid mnemonic phrase");
            }
            println!("valid");
        }
    }

    Ok(())
}
