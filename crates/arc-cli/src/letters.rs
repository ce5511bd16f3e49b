//! Sending one payload to many recipients.
//!
//! Each recipient is handled start to finish (keypair, stored private key,
//! encryption, delivery) before the next one begins. A failure is recorded
//! and the remaining recipients are still processed.

use std::fmt::Write as _;
use std::path::PathBuf;

use arc_core::config::KeySize;
use arc_core::{ArcError, ArcResult, Recipient};
use arc_crypto::{encrypt, generate_keypair, store_private_key, KeyProtection};
use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, warn};

use crate::delivery::{Delivery, Letter};
use crate::payload::Payload;

/// Format a key-file timestamp, rejecting formats unusable as a file name.
///
/// The format must change from one minute to the next, so `%Y-%m-%d` alone
/// is refused.
pub fn format_timestamp<Tz: TimeZone>(now: &DateTime<Tz>, format: &str) -> ArcResult<String>
where
    Tz::Offset: std::fmt::Display,
{
    let out = render(now, format)?;
    if out.is_empty() || out.contains(['/', '\\']) || out == "." || out == ".." {
        return Err(ArcError::Config(format!(
            "timestamp format '{format}' does not produce a usable file name"
        )));
    }

    let minute_apart = Utc
        .with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .zip(Utc.with_ymd_and_hms(2000, 1, 1, 0, 1, 0).single());
    if let Some((a, b)) = minute_apart {
        if render(&a, format)? == render(&b, format)? {
            return Err(ArcError::Config(format!(
                "timestamp format '{format}' must include the minute (e.g. %M)"
            )));
        }
    }
    Ok(out)
}

fn render<Tz: TimeZone>(now: &DateTime<Tz>, format: &str) -> ArcResult<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    write!(out, "{}", now.format(format))
        .map_err(|_| ArcError::Config(format!("invalid timestamp format '{format}'")))?;
    Ok(out)
}

/// A recipient that received their letter.
#[derive(Debug)]
pub struct Delivered {
    pub recipient: Recipient,
    pub key_path: PathBuf,
}

/// Outcome of one send across all recipients.
#[derive(Debug, Default)]
pub struct SendReport {
    pub delivered: Vec<Delivered>,
    pub failed: Vec<(String, ArcError)>,
}

impl SendReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct LetterSender<D> {
    key_dir: PathBuf,
    key_size: KeySize,
    protection: KeyProtection,
    delivery: D,
}

impl<D: Delivery> LetterSender<D> {
    pub fn new(
        key_dir: impl Into<PathBuf>,
        key_size: KeySize,
        protection: KeyProtection,
        delivery: D,
    ) -> Self {
        Self {
            key_dir: key_dir.into(),
            key_size,
            protection,
            delivery,
        }
    }

    /// Encrypt and deliver `payload` to every address in `recipients`.
    ///
    /// `on_progress` is called after each recipient, successful or not.
    pub async fn send_letter(
        &self,
        payload: &Payload,
        recipients: &[String],
        subject: &str,
        timestamp: &str,
        mut on_progress: impl FnMut(&str),
    ) -> ArcResult<SendReport> {
        if recipients.is_empty() {
            return Err(ArcError::Validation(
                "must specify at least one recipient".into(),
            ));
        }

        let mut report = SendReport::default();
        for address in recipients {
            match self
                .process_recipient(address, payload, subject, timestamp)
                .await
            {
                Ok(delivered) => {
                    info!(
                        recipient = %delivered.recipient,
                        key_path = %delivered.key_path.display(),
                        bytes = payload.data.len(),
                        "letter delivered"
                    );
                    report.delivered.push(delivered);
                }
                Err(e) => {
                    warn!(recipient = %address, error = %e, "letter not delivered");
                    report.failed.push((address.clone(), e));
                }
            }
            on_progress(address);
        }
        Ok(report)
    }

    /// One recipient, start to finish. Nothing from this call survives into
    /// the next except the private key file.
    pub async fn process_recipient(
        &self,
        address: &str,
        payload: &Payload,
        subject: &str,
        timestamp: &str,
    ) -> ArcResult<Delivered> {
        let recipient = Recipient::parse(address)?;

        let (private_key, public_key) = generate_keypair(self.key_size)?;
        let key_path = store_private_key(
            &self.key_dir,
            &recipient,
            timestamp,
            &private_key,
            &self.protection,
        )?;
        drop(private_key);

        let attachment = encrypt(&payload.data, &public_key)?;
        drop(public_key);

        let letter = Letter {
            recipient,
            subject: subject.to_string(),
            source_name: payload.name.clone(),
            attachment,
        };
        self.delivery.deliver(&letter).await?;

        Ok(Delivered {
            recipient: letter.recipient,
            key_path,
        })
    }
}
