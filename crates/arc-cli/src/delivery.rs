//! Letter delivery: SMTP via lettre, or a filesystem drop directory.
//!
//! Neither implementation knows how the attachment was produced; they only
//! move bytes to the recipient.

use std::future::Future;
use std::path::{Path, PathBuf};

use arc_core::{ArcError, ArcResult, Recipient};
use arc_crypto::store::{container_file_name, write_container};
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// One recipient's encrypted letter, ready to deliver.
#[derive(Debug, Clone)]
pub struct Letter {
    pub recipient: Recipient,
    pub subject: String,
    /// File name of the plaintext input (e.g. `letter.md`)
    pub source_name: String,
    /// The encrypted container
    pub attachment: Vec<u8>,
}

impl Letter {
    /// `<source_name>.enc`
    pub fn attachment_name(&self) -> ArcResult<String> {
        container_file_name(Path::new(&self.source_name))
    }
}

/// Moves a finished letter to its recipient.
pub trait Delivery {
    fn deliver(&self, letter: &Letter) -> impl Future<Output = ArcResult<()>> + Send;
}

/// STARTTLS SMTP relay delivery.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(
        config: &arc_core::config::SmtpConfig,
        password: &SecretString,
    ) -> ArcResult<Self> {
        let from_addr = config
            .from
            .as_deref()
            .ok_or_else(|| ArcError::Config("smtp.from is not set".into()))?;
        let from: Mailbox = from_addr
            .parse()
            .map_err(|e| ArcError::Config(format!("invalid smtp.from '{from_addr}': {e}")))?;
        let login = config.login().unwrap_or(from_addr).to_string();

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| ArcError::Delivery(format!("SMTP relay {}: {e}", config.host)))?
            .port(config.port)
            .credentials(Credentials::new(
                login,
                password.expose_secret().to_string(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

impl Delivery for SmtpMailer {
    async fn deliver(&self, letter: &Letter) -> ArcResult<()> {
        let message = build_message(self.from.clone(), letter)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| ArcError::Delivery(format!("sending to {}: {e}", letter.recipient)))?;
        Ok(())
    }
}

/// Build the MIME message: a short text part plus the `.enc` attachment.
pub fn build_message(from: Mailbox, letter: &Letter) -> ArcResult<Message> {
    let to: Mailbox = letter
        .recipient
        .as_str()
        .parse()
        .map_err(|e| ArcError::Validation(format!("recipient {}: {e}", letter.recipient)))?;
    let attachment_name = letter.attachment_name()?;
    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| ArcError::Delivery(format!("content type: {e}")))?;

    let body = format!(
        "An encrypted letter is attached as {attachment_name}.\n\
         Decrypt it with the private key the sender gave you:\n\n\
         \tarc decrypt --key <key.pem> {attachment_name}\n"
    );

    Message::builder()
        .from(from)
        .to(to)
        .subject(letter.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body))
                .singlepart(
                    Attachment::new(attachment_name).body(letter.attachment.clone(), content_type),
                ),
        )
        .map_err(|e| ArcError::Delivery(format!("building message: {e}")))
}

/// Writes each letter to `<dir>/<sanitized recipient>/<source_name>.enc`.
///
/// A later letter with the same name lands in `<source_name>-1.enc` and so on,
/// mirroring the key file suffixes.
#[derive(Debug, Clone)]
pub struct DropDirectory {
    dir: PathBuf,
}

impl DropDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn recipient_dir(&self, recipient: &Recipient) -> PathBuf {
        self.dir.join(recipient.sanitized())
    }
}

impl Delivery for DropDirectory {
    async fn deliver(&self, letter: &Letter) -> ArcResult<()> {
        let path = write_container(
            &self.recipient_dir(&letter.recipient),
            Path::new(&letter.source_name),
            &letter.attachment,
        )?;
        debug!(path = %path.display(), "letter written to drop directory");
        Ok(())
    }
}
