use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ArcError, ArcResult};

/// Top-level configuration (loaded from arc.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcConfig {
    pub keys: KeysConfig,
    pub smtp: SmtpConfig,
    pub editor: EditorConfig,
    pub log: LogConfig,
}

impl ArcConfig {
    /// Parse a TOML document. Missing sections and fields take their defaults.
    pub fn parse(toml_str: &str) -> ArcResult<Self> {
        toml::from_str(toml_str).map_err(|e| ArcError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> ArcResult<String> {
        toml::to_string_pretty(self).map_err(|e| ArcError::Config(e.to_string()))
    }

    /// Checks that only matter once a letter is actually being sent.
    pub fn validate_for_send(&self) -> ArcResult<()> {
        if self.smtp.from.as_deref().map_or(true, str::is_empty) {
            return Err(ArcError::Config(
                "smtp.from must be set to the sender address".into(),
            ));
        }
        if self.smtp.host.is_empty() {
            return Err(ArcError::Config("smtp.host must not be empty".into()));
        }
        if self.keys.timestamp_format.is_empty() {
            return Err(ArcError::Config(
                "keys.timestamp_format must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// RSA modulus sizes accepted for per-recipient keypairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum KeySize {
    #[default]
    Rsa2048,
    Rsa3072,
    Rsa4096,
}

impl KeySize {
    pub fn bits(self) -> usize {
        match self {
            KeySize::Rsa2048 => 2048,
            KeySize::Rsa3072 => 3072,
            KeySize::Rsa4096 => 4096,
        }
    }

    /// Length of the modulus, and so of every wrapped key, in bytes.
    pub fn modulus_bytes(self) -> usize {
        self.bits() / 8
    }
}

impl TryFrom<usize> for KeySize {
    type Error = ArcError;

    fn try_from(bits: usize) -> Result<Self, Self::Error> {
        match bits {
            2048 => Ok(KeySize::Rsa2048),
            3072 => Ok(KeySize::Rsa3072),
            4096 => Ok(KeySize::Rsa4096),
            other => Err(ArcError::Validation(format!(
                "unsupported RSA key size {other} (expected 2048, 3072 or 4096)"
            ))),
        }
    }
}

impl From<KeySize> for usize {
    fn from(size: KeySize) -> usize {
        size.bits()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Root directory for per-recipient private keys (default: private_keys)
    pub key_dir: PathBuf,
    /// RSA modulus size in bits (default: 2048)
    pub key_bits: KeySize,
    /// Encrypt stored private keys with a passphrase (default: false).
    /// When false, keys are written as plain PKCS#8 PEM.
    pub protect_private_keys: bool,
    /// Environment variable holding the key passphrase
    pub passphrase_env: String,
    /// chrono format string for key file names (default: %Y-%m-%d-%H-%M)
    pub timestamp_format: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("private_keys"),
            key_bits: KeySize::default(),
            protect_private_keys: false,
            passphrase_env: "ARC_KEY_PASSPHRASE".into(),
            timestamp_format: "%Y-%m-%d-%H-%M".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// SMTP relay host (STARTTLS)
    pub host: String,
    /// SMTP submission port (default: 587)
    pub port: u16,
    /// Sender address
    pub from: Option<String>,
    /// Login name (defaults to `from`)
    pub username: Option<String>,
    /// Environment variable holding the SMTP password
    pub password_env: String,
}

impl SmtpConfig {
    pub fn login(&self) -> Option<&str> {
        self.username.as_deref().or(self.from.as_deref())
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".into(),
            port: 587,
            from: None,
            username: None,
            password_env: "GMAIL_APP_PASSWORD".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor command for the subject line (falls back to $EDITOR, then vim)
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
