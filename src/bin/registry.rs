//! Schema Registry CLI
//!
//! Negotiate schemas against a registry and inspect wire envelopes.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use monitoring_schemas::{
    codec, envelope, HttpRegistryClient, RegistryBackend, SchemaCache, SchemaNegotiator,
    SchemasConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-registry")]
#[command(about = "Negotiate schemas with a registry and inspect wire envelopes")]
struct Cli {
    /// Config file (defaults to schemas.toml and SCHEMAS__* variables)
    #[arg(short, long)]
    config: Option<String>,

    /// Registry URL, overriding the configuration
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make sure a schema file is the latest version of a subject
    Ensure {
        /// Subject name (e.g., "transmission-value")
        subject: String,
        /// Path to the Avro schema file
        spec: PathBuf,
    },

    /// Show the latest schema registered under a subject
    Latest {
        /// Subject name
        subject: String,
    },

    /// Decode the header of an envelope, and its payload when the writer schema is known
    Inspect {
        /// File holding one raw envelope
        file: PathBuf,
        /// Subject whose latest schema should be used to decode the payload
        #[arg(short, long)]
        subject: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = SchemasConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(url) = cli.url {
        config.registry.url = url;
    }
    let client = HttpRegistryClient::new(&config.registry)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Ensure { subject, spec } => {
            let text = std::fs::read_to_string(&spec)
                .with_context(|| format!("failed to read schema file {}", spec.display()))?;
            let negotiator = SchemaNegotiator::new(client).with_cancellation(cancel);
            let schema = negotiator.ensure_schema(&subject, &text).await?;

            println!("subject:     {}", schema.subject);
            println!("id:          {}", schema.id);
            println!("version:     {}", schema.version);
            println!("fingerprint: {}", schema.document().fingerprint());
            Ok(())
        }

        Commands::Latest { subject } => {
            let latest = client.fetch_latest(&subject).await?;
            let schema = latest.into_schema()?;

            println!("subject: {}", schema.subject);
            println!("id:      {}", schema.id);
            println!("version: {}", schema.version);
            println!("{}", serde_json::to_string_pretty(schema.document().content())?);
            Ok(())
        }

        Commands::Inspect { file, subject } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let (id, payload) = envelope::split(&bytes)?;
            println!("schema id:    {}", id);
            println!("payload size: {} bytes", payload.len());

            let Some(subject) = subject else {
                return Ok(());
            };
            let schema = client.fetch_latest(&subject).await?.into_schema()?;
            if schema.id != id {
                bail!(
                    "envelope was written with schema {} but the latest schema of '{}' is {}",
                    id,
                    subject,
                    schema.id
                );
            }

            let cache: SchemaCache = std::iter::once(schema).collect();
            let (_, value) = codec::decode_value(&cache, &bytes)?;
            let json = serde_json::Value::try_from(value)
                .context("payload has no JSON representation")?;
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
    }
}
