mod config;
mod server;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::{parse_origins, Settings};
use pdf_qa_core::stores::pinecone_admin::CONTROL_PLANE_URL;
use pdf_qa_core::{IndexSetup, IndexSpec};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pdf-qa", version, about = "Ask questions about uploaded PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listen address
        #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8000")]
        addr: SocketAddr,

        /// Comma-separated list of allowed CORS origins
        #[arg(long, env = "CORS_ORIGINS", default_value = "")]
        cors_origins: String,
    },
    /// Ingest a PDF file, or every PDF below a folder.
    Ingest {
        #[arg(long)]
        path: PathBuf,
    },
    /// Ask a question about an ingested document and print the JSON answer.
    Ask {
        #[arg(long)]
        question: String,

        /// Document to search. Only the first one given is searched.
        #[arg(long = "document-id", required = true)]
        document_ids: Vec<Uuid>,

        #[arg(long)]
        session_id: Option<Uuid>,
    },
    /// Create the Pinecone index if it is missing, otherwise report its dimension and size.
    SetupIndex {
        #[arg(long, env = "PINECONE_INDEX_NAME", default_value = "rag-experiment")]
        name: String,

        /// Vector width; defaults to the embedding model's output width
        #[arg(long)]
        dimension: Option<usize>,

        #[arg(long, default_value = "aws")]
        cloud: String,

        #[arg(long, default_value = "us-east-1")]
        region: String,

        /// Pinecone control-plane base URL
        #[arg(long, env = "PINECONE_CONTROL_URL", default_value = CONTROL_PLANE_URL)]
        control_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-qa boot"
    );

    match cli.command {
        Command::Serve { addr, cors_origins } => {
            let services = cli.settings.build_services()?;
            let origins = parse_origins(&cors_origins);
            let state = server::AppState::new(services.ingestor, services.coordinator);
            let app = server::router(state, server::cors_layer(&origins));

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(%addr, origins = origins.len(), "listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("server stopped");
        }
        Command::Ingest { path } => {
            let services = cli.settings.build_services()?;
            let outcome = services.ingestor.ingest_path(&path).await?;

            for skipped in &outcome.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
            }
            if outcome.ingested.is_empty() {
                bail!("no PDF could be ingested from {}", path.display());
            }

            for (file, report) in &outcome.ingested {
                println!(
                    "{}\t{}\t{} chunks",
                    report.document_id,
                    file.display(),
                    report.chunk_count
                );
            }
        }
        Command::Ask {
            question,
            document_ids,
            session_id,
        } => {
            let services = cli.settings.build_services()?;
            let response = services
                .coordinator
                .answer(&question, Some(&document_ids), session_id)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::SetupIndex {
            name,
            dimension,
            cloud,
            region,
            control_url,
        } => {
            let dimension = cli.settings.index_dimension(dimension)?;
            let admin = cli.settings.pinecone_admin(&control_url)?;
            let spec = IndexSpec {
                cloud,
                region,
                ..IndexSpec::serverless(name, dimension)
            };

            match admin.ensure_index(&spec).await? {
                IndexSetup::Existing { description, stats } => {
                    println!("Index '{}' already exists", description.name);
                    println!("  Host: {}", description.host);
                    println!("  Metric: {}", description.metric);
                    println!("  Dimension: {}", stats.dimension);
                    println!("  Vectors: {}", stats.total_vector_count);
                    println!("  Namespaces: {}", stats.namespace_count);

                    if description.metric != spec.metric {
                        warn!(metric = %description.metric, "index is not using cosine similarity");
                    }
                    if stats.dimension != dimension {
                        bail!(
                            "index '{}' has dimension {}, expected {dimension}",
                            description.name,
                            stats.dimension
                        );
                    }
                }
                IndexSetup::Created(description) => {
                    println!("Created index '{}'", description.name);
                    println!("  Dimension: {dimension}");
                    println!("  Metric: {}", spec.metric);
                    if description.host.is_empty() {
                        println!("  Host: pending until the index is ready");
                    } else {
                        println!("  Host: {} (set PINECONE_INDEX_HOST)", description.host);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
