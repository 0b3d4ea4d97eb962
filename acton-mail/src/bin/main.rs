//! acton-mail CLI tool

use std::path::{Path, PathBuf};

use acton_mail::{
    config::MailerSettings, observability, Address, Mailer, MailerSelector, Message,
    SendInterceptor,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::fs::File;
use tracing::info;

#[derive(Parser)]
#[command(name = "acton-mail")]
#[command(version)]
#[command(about = "Send mail through the configured provider", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./acton-mail.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message
    Send(SendArgs),
    /// Load settings and build the provider without sending anything
    CheckConfig,
}

#[derive(Args)]
struct SendArgs {
    /// Sender, as `addr` or `Name <addr>`
    #[arg(long)]
    from: String,
    /// Recipient (repeatable)
    #[arg(long, required = true)]
    to: Vec<String>,
    /// Carbon-copy recipient (repeatable)
    #[arg(long)]
    cc: Vec<String>,
    /// Blind carbon-copy recipient (repeatable)
    #[arg(long)]
    bcc: Vec<String>,
    /// Subject line
    #[arg(long, default_value = "")]
    subject: String,
    /// HTML body
    #[arg(long)]
    html: Option<String>,
    /// Plain text body
    #[arg(long)]
    text: Option<String>,
    /// Custom header as `Name:Value` (repeatable)
    #[arg(long = "header")]
    headers: Vec<String>,
    /// File to attach (repeatable)
    #[arg(long)]
    attach: Vec<PathBuf>,
    /// File to attach inline (repeatable)
    #[arg(long)]
    inline: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init()?;
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => MailerSettings::load_from(path),
        None => MailerSettings::load(),
    }
    .context("failed to load mail settings")?;

    let selector = MailerSelector::new(&settings).context("failed to build mail provider")?;

    match cli.command {
        Commands::CheckConfig => {
            info!(provider = %selector.provider(), "configuration ok");
            println!("provider: {}", selector.provider());
        }
        Commands::Send(args) => {
            selector
                .on_send()
                .register(observability::SendLogger::new("cli"));
            let message = build_message(args).await?;
            selector.send(message).await.context("send failed")?;
        }
    }

    Ok(())
}

async fn build_message(args: SendArgs) -> Result<Message> {
    let mut message = Message::new(parse_address(&args.from)?).subject(args.subject);

    for to in &args.to {
        message = message.to(parse_address(to)?);
    }
    for cc in &args.cc {
        message = message.cc(parse_address(cc)?);
    }
    for bcc in &args.bcc {
        message = message.bcc(parse_address(bcc)?);
    }
    if let Some(html) = args.html {
        message = message.html(html);
    }
    if let Some(text) = args.text {
        message = message.text(text);
    }
    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        message = message.header(name, value);
    }
    for path in &args.attach {
        let (filename, file) = open_attachment(path).await?;
        message = message.attach(filename, file);
    }
    for path in &args.inline {
        let (filename, file) = open_attachment(path).await?;
        message = message.inline(filename, file);
    }

    Ok(message)
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse::<Address>()
        .with_context(|| format!("invalid address: {raw}"))
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header must be Name:Value, got {raw:?}");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("header name is empty in {raw:?}");
    }
    Ok((name, value.trim()))
}

async fn open_attachment(path: &Path) -> Result<(String, File)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("attachment path has no file name: {}", path.display()))?
        .to_string();
    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open attachment {}", path.display()))?;
    Ok((filename, file))
}
