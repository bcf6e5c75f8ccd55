mod broker;
mod config;
mod error;
mod flow;
mod listing;
mod session;
mod stager;
#[cfg(test)]
mod testserver;
mod uploader;

use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::MultiProgress;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use walkdir::WalkDir;

use broker::BrokerClient;
use config::Config;
use listing::{ListingClient, ListingDraft};
use session::Session;
use stager::FileStager;

/// The marketplace accepts at most this many images per listing
const MAX_IMAGES: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "sell",
    version = env!("CARGO_PKG_VERSION"),
    about = "List an item on the campus marketplace with pre-signed image uploads",
    long_about = "Stages local images, obtains pre-signed upload URLs from the marketplace \
                  backend, uploads the images directly to storage, and submits the listing. \
                  Configure via .env with MARKET_API_URL and MARKET_SESSION_TOKEN.",
    after_help = "Examples:\n  \
                  sell ./lamp.jpg --title \"Desk lamp\" --description \"Barely used\" \\\n       \
                  --category hostel --price 300 --condition good\n  \
                  sell ./photos --title \"Cycle\" --description \"...\" --category cycles \\\n       \
                  --price 2500 --condition fair --contact-method whatsapp --phone 9000000000\n  \
                  sell ./photos --dry-run ...            # Show what would be uploaded\n\n\
                  Configuration (.env):\n  \
                  MARKET_API_URL=http://localhost:8080/api\n  \
                  MARKET_SESSION_TOKEN=<token from login>"
)]
struct Cli {
    /// Image file or directory of images for the listing
    path: PathBuf,

    /// Listing title
    #[arg(long)]
    title: String,

    /// Listing description
    #[arg(long)]
    description: String,

    /// Category (books, electronics, cycles, hostel, projects, other)
    #[arg(long)]
    category: String,

    /// Asking price in whole rupees
    #[arg(long)]
    price: u64,

    /// Condition (new, good, fair, poor)
    #[arg(long)]
    condition: String,

    /// Preferred contact method (app, whatsapp, phone, email)
    #[arg(long, default_value = "app")]
    contact_method: String,

    /// Contact phone number
    #[arg(long)]
    phone: Option<String>,

    /// Contact email
    #[arg(long)]
    email: Option<String>,

    /// Preferred meeting location on campus
    #[arg(long, default_value = "library")]
    meeting_location: String,

    /// Allowed image extensions (comma-separated)
    #[arg(long, short = 'e', default_value = "jpg,jpeg,png,webp,gif", value_delimiter = ',')]
    extensions: Vec<String>,

    /// Per-image upload timeout in seconds
    #[arg(long, default_value_t = uploader::DEFAULT_UPLOAD_TIMEOUT.as_secs())]
    upload_timeout_secs: u64,

    /// Stage and validate only; no network calls
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    // Initialize tracing/logging with support for LOG_LEVEL from .env
    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    info!("Marketplace sell tool v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let session = Session::from_env()?;

    // Collect and stage image files
    let files = collect_files(&cli.path, &cli.extensions)?;
    if files.is_empty() {
        println!(
            "{}",
            style(format!(
                "No images found with extensions: {}",
                cli.extensions.join(", ")
            ))
            .yellow()
        );
        return Ok(());
    }

    let mut stager = FileStager::new();
    for file in &files {
        if stager.len() == MAX_IMAGES {
            println!(
                "{}",
                style(format!(
                    "⚠ More than {} images found; extra files are ignored",
                    MAX_IMAGES
                ))
                .yellow()
            );
            break;
        }
        match stager.accept(file) {
            Ok(staged) => {
                info!("Staged {} ({})", staged.display_name, staged.mime_type);
            }
            Err(e @ error::SellError::FileTooLarge { .. }) => {
                println!(
                    "{} {} {}",
                    style("⚠").yellow(),
                    style(file.display()).yellow(),
                    style("(skipped - over 5 MiB)").dim()
                );
                error!("{}", e);
            }
            Err(e) => {
                eprintln!("{}", style(e.user_message()).red());
                std::process::exit(1);
            }
        }
    }

    if stager.is_empty() {
        println!("{}", style("No images could be staged").yellow());
        return Ok(());
    }

    let draft = ListingDraft {
        title: cli.title,
        description: cli.description,
        category: cli.category,
        price: cli.price,
        condition: cli.condition,
        contact_method: cli.contact_method,
        phone: cli.phone,
        email: cli.email,
        meeting_location: cli.meeting_location,
        image_urls: Vec::new(),
    };

    let total_bytes: u64 = stager.files().iter().map(|f| f.size_bytes).sum();
    println!(
        "{}",
        style(format!(
            "📦 Listing \"{}\" with {} image(s), {}",
            draft.title,
            stager.len(),
            format_size(total_bytes)
        ))
        .cyan()
        .bold()
    );

    if cli.dry_run {
        println!(
            "{}",
            style("🔍 DRY RUN MODE - Nothing will be uploaded or submitted")
                .yellow()
                .bold()
        );
        println!();
        for staged in stager.files() {
            println!(
                "  {} {} ({}, {})",
                style("WOULD UPLOAD").green().bold(),
                staged.display_name,
                staged.mime_type,
                format_size(staged.size_bytes)
            );
        }
        return Ok(());
    }

    let upload_timeout = Duration::from_secs(cli.upload_timeout_secs);
    let http = reqwest::Client::builder()
        .use_rustls_tls()
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    let broker = BrokerClient::new(http.clone(), config.sign_url(), session.clone());
    let listings = ListingClient::new(http.clone(), config.listings_url(), session);

    let multi = MultiProgress::new();
    match flow::submit_listing(
        &http,
        &broker,
        &listings,
        &stager,
        &draft,
        upload_timeout,
        Some(&multi),
    )
    .await
    {
        Ok(record) => {
            stager.clear();
            println!();
            println!(
                "{} {}",
                style("✓").green(),
                style(format!("Listing submitted: \"{}\"", record.title)).green()
            );
            println!("  {} {}", style("id").dim(), style(&record.id).dim());
            if let Some(created_at) = &record.created_at {
                println!("  {} {}", style("created").dim(), style(created_at).dim());
            }
            println!(
                "{}",
                style(format!(
                    "Uploaded {} image(s), {}",
                    files.len().min(MAX_IMAGES),
                    format_size(total_bytes)
                ))
                .dim()
            );
            Ok(())
        }
        Err(e) => {
            error!("Sell flow failed: {:#}", e);
            eprintln!();
            eprintln!("{} {}", style("✗").red(), style(e.user_message()).red());
            std::process::exit(1);
        }
    }
}

/// Collect image files from the given path, filtered by extensions.
///
/// Directory walks are sorted by path so the staged order (and hence the
/// image order on the listing) is deterministic.
fn collect_files(path: &Path, allowed_extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    // Normalize extensions to lowercase for case-insensitive matching
    let extensions: Vec<String> = allowed_extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect();

    if path.is_file() {
        if let Some(ext) = path.extension() {
            let file_ext = ext.to_string_lossy().to_lowercase();
            if extensions.contains(&file_ext) {
                files.push(path.to_path_buf());
            }
        }
    } else if path.is_dir() {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let entry_path = entry.path();
            if let Some(ext) = entry_path.extension() {
                let file_ext = ext.to_string_lossy().to_lowercase();
                if extensions.contains(&file_ext) {
                    files.push(entry_path.to_path_buf());
                }
            }
        }
    } else {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    Ok(files)
}

/// Format file size for display
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
