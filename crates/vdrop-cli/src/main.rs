//! vdrop: VeilDrop CLI
//!
//! Commands:
//!   send <path>      - encrypt a file locally and upload it; prints the share link
//!   receive <link>   - download and decrypt a share link to a local file
//!
//! Encryption happens entirely in this process; the relay only ever sees
//! ciphertext, and the printed link's fragment is the sole copy of the key.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use vdrop_core::config::DEFAULT_MAX_PAYLOAD_BYTES;
use vdrop_core::ObjectId;
use vdrop_relay::{HttpTransport, RelayClient};

#[derive(Parser, Debug)]
#[command(
    name = "vdrop",
    version,
    about = "VeilDrop client",
    long_about = "vdrop: share files through a relay that can never read them"
)]
struct Cli {
    /// Relay base URL
    #[arg(
        long,
        short = 'r',
        env = "VDROP_RELAY",
        default_value = "http://127.0.0.1:8080"
    )]
    relay: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VDROP_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file and upload it; prints the share link on success
    Send {
        /// Local file to send
        path: PathBuf,
        /// Declared content type (default: guessed from the file extension)
        #[arg(long, short = 't')]
        content_type: Option<String>,
        /// Identifier to store under (default: fresh random token)
        #[arg(long)]
        file_key: Option<String>,
        /// Maximum payload size in bytes
        #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD_BYTES)]
        max_payload_bytes: u64,
    },

    /// Download a share link and decrypt it to a local file
    Receive {
        /// Share link, including its #fragment
        link: String,
        /// Destination path (default: the identifier in the current directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let client = RelayClient::new(
        HttpTransport::new(&cli.relay),
        &cli.relay,
        match &cli.command {
            Commands::Send {
                max_payload_bytes, ..
            } => *max_payload_bytes,
            Commands::Receive { .. } => DEFAULT_MAX_PAYLOAD_BYTES,
        },
    );

    match cli.command {
        Commands::Send {
            path,
            content_type,
            file_key,
            ..
        } => send(&client, &path, content_type, file_key).await,
        Commands::Receive { link, output } => receive(&client, &link, output).await,
    }
}

async fn send(
    client: &RelayClient<HttpTransport>,
    path: &Path,
    content_type: Option<String>,
    file_key: Option<String>,
) -> Result<()> {
    let plaintext = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(path).to_string());
    debug!(bytes = plaintext.len(), content_type = %content_type, "sending");

    let sealed = match file_key {
        Some(raw) => {
            let id = ObjectId::parse(&raw).context("invalid --file-key")?;
            client.send_with_id(id, &plaintext, &content_type).await?
        }
        None => client.send(&plaintext, &content_type).await?,
    };

    println!("{}", sealed.link);
    Ok(())
}

async fn receive(
    client: &RelayClient<HttpTransport>,
    link: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let received = client.receive(link).await?;

    let output = match output {
        Some(path) => path,
        None => {
            // Fall back to the identifier as a file name
            let (id, _) = vdrop_crypto::parse_link(link).context("invalid share link")?;
            PathBuf::from(id)
        }
    };

    tokio::fs::write(&output, &received.bytes)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    eprintln!(
        "wrote {} bytes ({}) to {}",
        received.bytes.len(),
        received.content_type,
        output.display()
    );
    Ok(())
}

/// Minimal extension-based content-type guess for the declared metadata.
/// The relay treats this as opaque either way.
fn guess_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("txt") => "text/plain",
        Some("html") => "text/html",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("zip") => "application/zip",
        Some("tar") => "application/x-tar",
        Some("gz") => "application/gzip",
        _ => "application/octet-stream",
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
