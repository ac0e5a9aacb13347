use clap::Parser;
use collate::{DocumentInfo, JobManifest, SessionBuilder, SessionConfig, SessionError};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

// Many short-lived pictures per session; mimalloc keeps fragmentation down.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Replays a job manifest of frame recordings and writes the composed PDF.
#[derive(Parser, Debug)]
#[command(name = "collate", version)]
struct Cli {
    /// Path to the JSON job manifest.
    manifest: PathBuf,

    /// Where to write the composed PDF.
    #[arg(short, long, default_value = "collate.pdf")]
    output: PathBuf,

    /// Optional JSON session config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Give up on the session after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Document title, overriding the manifest's.
    #[arg(long)]
    title: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("COLLATE_LOG", "info")).init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("collate: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool, SessionError> {
    let config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    let mut manifest = JobManifest::from_file(&cli.manifest)?;
    if let Some(title) = cli.title {
        let info = manifest.document_info.get_or_insert_with(DocumentInfo::default);
        info.title = Some(title);
    }

    let mut builder = SessionBuilder::new().with_config(config);
    if let Some(secs) = cli.timeout_secs {
        builder = builder.with_timeout(Duration::from_secs(secs));
    }
    let session = builder.build();

    info!("Replaying {} events from {}", manifest.events.len(), cli.manifest.display());
    let outcome = manifest.replay(&session.handle()).await?;
    session.shutdown().await?;

    let Some(composed) = outcome.final_output() else {
        eprintln!("collate: the manifest requested no composition");
        return Ok(false);
    };
    println!("Composition finished: {}", composed.status);
    if !composed.has_output() {
        return Ok(false);
    }

    std::fs::write(&cli.output, &composed.bytes)?;
    println!("Wrote {} ({} bytes)", cli.output.display(), composed.bytes.len());
    Ok(true)
}
