//! arc: send encrypted letters
//!
//! Commands:
//!   send --recipient EMAIL... [--subject S] INPUT   - encrypt per recipient and email
//!   decrypt --key KEY CONTAINER                     - open a received letter
//!   config show                                     - display current configuration
//!
//! Every recipient gets a fresh RSA keypair. The private key stays with the
//! sender under `<key_dir>/<recipient>/<timestamp>.pem` and must be handed to
//! the recipient out of band.

mod delivery;
mod editor;
mod letters;
mod payload;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use arc_core::config::ArcConfig;
use arc_crypto::KeyProtection;

use crate::delivery::{Delivery, DropDirectory, SmtpMailer};
use crate::letters::{LetterSender, SendReport};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "arc",
    version,
    about = "Send encrypted letters to recipients",
    after_help = "Examples:
  Send to a single recipient:
    arc send --recipient daughter@example.com letter.md

  Send to multiple recipients:
    arc send --recipient daughter1@example.com --recipient daughter2@example.com letter.md

  Send with a subject:
    arc send --recipient daughter@example.com --subject \"Happy Birthday\" letter.md

  Send a folder (will be archived automatically):
    arc send --recipient daughter@example.com folder/"
)]
struct Cli {
    /// Path to arc.toml configuration file
    #[arg(long, short = 'c', env = "ARC_CONFIG", default_value = "~/.config/arc/config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "ARC_LOG")]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long, env = "ARC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file or directory for each recipient and email it
    ///
    /// The SMTP password is read from the environment variable named by
    /// smtp.password_env (default: GMAIL_APP_PASSWORD).
    Send {
        /// Recipient email address (repeat for multiple recipients)
        #[arg(long = "recipient", short = 'r', value_name = "EMAIL", required = true)]
        recipients: Vec<String>,
        /// Email subject line (opens an editor if omitted)
        #[arg(long, short = 's')]
        subject: Option<String>,
        /// Directory for storing private keys (overrides config)
        #[arg(long)]
        key_dir: Option<PathBuf>,
        /// Write letters to this directory instead of emailing them
        #[arg(long, value_name = "DIR")]
        drop_dir: Option<PathBuf>,
        /// File or directory to encrypt and send
        input: PathBuf,
    },

    /// Decrypt a received `.enc` letter with its private key
    Decrypt {
        /// Private key file (PKCS#8 PEM)
        #[arg(long, short = 'k')]
        key: PathBuf,
        /// Output path (default: container path without `.enc`)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,
        /// Encrypted letter
        container: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path).await?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match &cli.log_format {
        Some(format) => format.clone(),
        None if config.log.format.eq_ignore_ascii_case("json") => LogFormat::Json,
        None => LogFormat::Text,
    };
    init_logging(&level, &format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "arc starting"
    );

    match cli.command {
        Commands::Send { recipients, subject, key_dir, drop_dir, input } => {
            cmd_send(&config, &recipients, subject.as_deref(), key_dir, drop_dir, &input).await
        }
        Commands::Decrypt { key, output, force, container } => {
            cmd_decrypt(&config, &key, output.as_deref(), force, &container).await
        }
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<ArcConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        ArcConfig::parse(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(ArcConfig::default())
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Secrets ───────────────────────────────────────────────────────────────────

/// Read a secret from `env_var`, falling back to an interactive prompt.
fn secret_from_env_or_prompt(env_var: &str, prompt: &str) -> Result<SecretString> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return Ok(SecretString::from(value));
        }
    }
    let value = rpassword::prompt_password(prompt)
        .with_context(|| format!("reading {prompt:?} (or set {env_var})"))?;
    Ok(SecretString::from(value))
}

fn key_protection(config: &ArcConfig) -> Result<KeyProtection> {
    if !config.keys.protect_private_keys {
        return Ok(KeyProtection::None);
    }
    let passphrase =
        secret_from_env_or_prompt(&config.keys.passphrase_env, "Private key passphrase: ")?;
    Ok(KeyProtection::Passphrase(passphrase))
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

// ── `arc send` ────────────────────────────────────────────────────────────────

async fn cmd_send(
    config: &ArcConfig,
    recipients: &[String],
    subject: Option<&str>,
    key_dir: Option<PathBuf>,
    drop_dir: Option<PathBuf>,
    input: &Path,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("path does not exist: {}", input.display());
    }

    let timestamp = letters::format_timestamp(&chrono::Local::now(), &config.keys.timestamp_format)?;
    let subject = editor::resolve_subject(subject, config.editor.command.as_deref()).await?;
    let payload = payload::prepare(input, &timestamp)?;
    let key_dir = key_dir.unwrap_or_else(|| expand_tilde(&config.keys.key_dir));
    let protection = key_protection(config)?;

    info!(
        input = %input.display(),
        payload = %payload.name,
        bytes = payload.data.len(),
        recipients = recipients.len(),
        "sending letter"
    );

    let report = match drop_dir {
        Some(dir) => {
            let delivery = DropDirectory::new(dir);
            send_with(delivery, config, key_dir.clone(), protection, &payload, recipients, &subject, &timestamp).await?
        }
        None => {
            config.validate_for_send()?;
            let password = std::env::var(&config.smtp.password_env).with_context(|| {
                format!(
                    "SMTP password not set\n\
                     Set the {} environment variable (e.g. a Gmail app password).",
                    config.smtp.password_env
                )
            })?;
            let mailer = SmtpMailer::new(&config.smtp, &SecretString::from(password))?;
            send_with(mailer, config, key_dir.clone(), protection, &payload, recipients, &subject, &timestamp).await?
        }
    };

    print_report(&report, &key_dir);

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} recipient(s) failed",
            report.failed.len(),
            recipients.len()
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn send_with<D: Delivery>(
    delivery: D,
    config: &ArcConfig,
    key_dir: PathBuf,
    protection: KeyProtection,
    payload: &payload::Payload,
    recipients: &[String],
    subject: &str,
    timestamp: &str,
) -> Result<SendReport> {
    let sender = LetterSender::new(key_dir, config.keys.key_bits, protection, delivery);
    let pb = make_progress_bar(recipients.len() as u64, "Sending");

    let report = sender
        .send_letter(payload, recipients, subject, timestamp, |address| {
            pb.set_message(address.to_string());
            pb.inc(1);
        })
        .await?;

    pb.finish_and_clear();
    Ok(report)
}

fn print_report(report: &SendReport, key_dir: &Path) {
    if !report.delivered.is_empty() {
        println!(
            "Sent letter to {} recipient(s)",
            report.delivered.len()
        );
        println!("\nPrivate keys stored in:");
        for delivered in &report.delivered {
            println!("  {}  {}", delivered.recipient, delivered.key_path.display());
        }
        println!(
            "\nKeys under {} are not passphrase-protected unless keys.protect_private_keys is set.",
            key_dir.display()
        );
    }
    for (address, err) in &report.failed {
        eprintln!("Error: {address}: {err}");
    }
}

// ── `arc decrypt` ─────────────────────────────────────────────────────────────

async fn cmd_decrypt(
    config: &ArcConfig,
    key: &Path,
    output: Option<&Path>,
    force: bool,
    container_path: &Path,
) -> Result<()> {
    let passphrase = if arc_crypto::is_encrypted_key(key)? {
        Some(secret_from_env_or_prompt(
            &config.keys.passphrase_env,
            "Private key passphrase: ",
        )?)
    } else {
        None
    };
    let private_key = arc_crypto::read_private_key(key, passphrase.as_ref())?;
    let container = arc_crypto::read_container(container_path)?;

    let plaintext = arc_crypto::decrypt(&container, &private_key)
        .with_context(|| format!("decrypting {}", container_path.display()))?;

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(container_path));
    if out.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", out.display());
    }
    tokio::fs::write(&out, &plaintext)
        .await
        .with_context(|| format!("writing {}", out.display()))?;

    info!(output = %out.display(), bytes = plaintext.len(), "letter decrypted");
    println!("Decrypted {} -> {}", container_path.display(), out.display());
    Ok(())
}

/// `letter.md.enc` → `letter.md`; anything else gets `.dec` appended.
fn default_output_path(container: &Path) -> PathBuf {
    let is_enc = container
        .extension()
        .is_some_and(|ext| ext == arc_crypto::store::CONTAINER_EXTENSION);
    if is_enc {
        container.with_extension("")
    } else {
        let mut name = container.as_os_str().to_os_string();
        name.push(".dec");
        PathBuf::from(name)
    }
}

// ── `arc config show` ─────────────────────────────────────────────────────────

fn cmd_config_show(config: &ArcConfig, path: &Path) -> Result<()> {
    let source = if path.exists() { "file" } else { "defaults" };
    println!("# arc configuration (source: {source} {})", path.display());
    print!("{}", config.to_toml_string()?);
    Ok(())
}
