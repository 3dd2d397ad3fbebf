use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use seqsum_config::SeqsumConfig;

use seqsum_runtime::engine::{SeqsumInstance, SeqsumRuntimeConfig, WasmModule};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Build the sequence a..=b inside the computation module and print its sum.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Lower bound (inclusive).
    #[arg(allow_negative_numbers = true)]
    a: i32,

    /// Upper bound (inclusive). A bound below `a` gives the empty sequence.
    #[arg(allow_negative_numbers = true)]
    b: i32,

    /// Path to the compiled computation module. Overrides the config file.
    #[arg(long)]
    module: Option<PathBuf>,

    /// Path to a YAML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Release the sequence before exiting and report the module's live count.
    #[arg(long)]
    release: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Arguments are validated before anything touches the module.
    let cli = Cli::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "seqsum_runtime=info,seqsum=info") };
    }

    let subscriber = tracing_subscriber::Registry::default()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::from_default_env());
    subscriber.try_init()?;

    let config = load_config(&cli)?;
    let total = run(&cli, &config).await?;
    println!("{total}");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<SeqsumConfig> {
    let mut config = match &cli.config {
        Some(path) => SeqsumConfig::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?,
        None => SeqsumConfig::default(),
    };
    if let Some(module) = &cli.module {
        config
            .override_module_path(module.clone())
            .map_err(|e| anyhow::anyhow!("Invalid --module: {}", e))?;
    }
    Ok(config)
}

async fn run(cli: &Cli, config: &SeqsumConfig) -> Result<i64> {
    let module_path = config.get_module_path();
    let wasm = WasmModule::load(&module_path).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to load WASM module from {}: {:#} (run `seqsum-module` to build it)",
            module_path.display(),
            e
        )
    })?;
    tracing::debug!(
        "Loaded {} (sha256={})",
        module_path.display(),
        wasm.metadata().sha256_hex()
    );

    let runtime_config = SeqsumRuntimeConfig::create_from_seqsum_config(config);
    let mut instance = SeqsumInstance::new(Arc::new(wasm), &runtime_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create runtime instance: {}", e))?;

    let seq = instance.init(cli.a, cli.b).await?;
    let total = instance.sum(&seq).await?;
    tracing::debug!(
        "sum of {} elements on instance {}: {}",
        seq.len(),
        instance.get_store().data().get_instance_id(),
        total
    );

    if cli.release {
        instance.release(seq).await?;
        match instance.live_count().await? {
            Some(live) => tracing::info!("Released sequence; {} still live", live),
            None => tracing::info!("Module reports no live count"),
        }
    }

    Ok(total)
}
