mod api;
mod db;
mod error;
mod export;
mod fetcher;
mod parser;
mod projection;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use tracing::{info, warn};

use projection::Projection;

#[derive(Parser)]
#[command(name = "menu_catalog", about = "Scrape a menu page into SQLite and serve it over HTTP")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "CATALOG_DB_PATH", default_value = db::DEFAULT_DB_PATH, global = true)]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape once if the database is empty, then serve the read API
    Serve {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        http: HttpArgs,
    },
    /// Scrape the menu now and replace the stored catalog
    Scrape {
        #[command(flatten)]
        source: SourceArgs,
        /// Print the scraped products as JSON instead of storing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the stored catalog
    Export {
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Comma-separated fields to keep (JSON only)
        #[arg(long, conflicts_with = "exclude")]
        include: Option<String>,
        /// Comma-separated fields to drop (JSON only)
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Show catalog statistics
    Stats,
}

#[derive(Args)]
struct SourceArgs {
    /// Menu page to scrape
    #[arg(long, env = "SCRAPER_URL")]
    source_url: String,
    /// Seconds before the menu fetch is abandoned
    #[arg(long, env = "SCRAPER_TIMEOUT_SECS", default_value_t = 30)]
    fetch_timeout_secs: u64,
}

#[derive(Args)]
struct HttpArgs {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "SERVER_BIND", default_value = "127.0.0.1:8080")]
    bind: String,
    /// Origins allowed by CORS, comma-separated
    #[arg(long, env = "HTTP_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,
    /// Methods advertised to CORS preflight requests
    #[arg(long, env = "HTTP_ALLOWED_METHODS", default_value = "GET, OPTIONS")]
    allowed_methods: String,
    /// Requests per minute per client (0 disables rate limiting)
    #[arg(long, env = "HTTP_MAX_REQUESTS_PER_MINUTE", default_value_t = 120)]
    max_requests_per_minute: u32,
    /// Requests a client may burst before being limited
    #[arg(long, env = "HTTP_RATE_LIMIT_BURST", default_value_t = 20)]
    rate_limit_burst: u32,
    /// Most client addresses the rate limiter keeps a bucket for (0 disables rate limiting)
    #[arg(long, env = "HTTP_RATE_LIMIT_CLIENTS", default_value_t = api::middleware::DEFAULT_TRACKED_CLIENTS)]
    rate_limit_clients: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let conn = db::connect(&cli.db_path)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Serve { source, http } => {
            let client = client_for(&source)?;
            fetcher::seed_if_empty(&conn, &client, &source.source_url).await?;
            serve(conn, http).await
        }
        Commands::Scrape { source, dry_run } => {
            let products = scrape(&source).await?;
            if dry_run {
                serde_json::to_writer_pretty(std::io::stdout().lock(), &products)?;
                println!();
            } else {
                let n = db::replace_products(&conn, &products)?;
                println!("Stored {} products.", n);
            }
            println!("\nDone in {}", format_duration(t0.elapsed()));
            Ok(())
        }
        Commands::Export {
            format,
            include,
            exclude,
        } => {
            let projection = match (include, exclude) {
                (Some(list), _) => Some(Projection::include(&list)),
                (None, Some(list)) => Some(Projection::exclude(&list)),
                (None, None) => None,
            };
            let products = db::fetch_products(&conn)?;
            let out = std::io::stdout().lock();
            match (format, projection) {
                (Format::Csv, projection) => {
                    if projection.is_some() {
                        warn!("CSV export always carries every column; ignoring field selection");
                    }
                    export::write_csv(out, &products)?;
                }
                (Format::Json, Some(projection)) => {
                    serde_json::to_writer_pretty(out, &projection::project(&products, &projection))?;
                    println!();
                }
                (Format::Json, None) => {
                    serde_json::to_writer_pretty(out, &products)?;
                    println!();
                }
            }
            Ok(())
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Products:     {}", s.products);
            println!("Categories:   {}", s.categories);
            println!(
                "Last scraped: {}",
                s.last_scraped_at.as_deref().unwrap_or("never")
            );
            Ok(())
        }
    }
}

fn client_for(source: &SourceArgs) -> anyhow::Result<reqwest::Client> {
    let timeout = Duration::from_secs(source.fetch_timeout_secs.max(1));
    Ok(fetcher::build_client(timeout)?)
}

async fn scrape(source: &SourceArgs) -> anyhow::Result<Vec<db::Product>> {
    let client = client_for(source)?;
    let products = fetcher::scrape(&client, &source.source_url)
        .await
        .with_context(|| format!("Scrape of {} failed", source.source_url))?;
    Ok(products)
}

async fn serve(conn: Connection, http: HttpArgs) -> anyhow::Result<()> {
    let config = api::ApiConfig {
        allowed_origins: http
            .allowed_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect(),
        allowed_methods: http.allowed_methods,
        max_requests_per_minute: http.max_requests_per_minute,
        rate_limit_burst: http.rate_limit_burst,
        rate_limit_clients: http.rate_limit_clients,
    };
    let state = api::AppState {
        db: Arc::new(Mutex::new(conn)),
    };
    let app = api::router(state, &config);

    let addr: SocketAddr = http
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", http.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Serving catalog on http://{}{}", addr, api::BASE_PATH);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server shutdown")?;
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
