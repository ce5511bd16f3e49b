pub mod config;
pub mod error;
pub mod recipient;

pub use error::{ArcError, ArcResult};
pub use recipient::Recipient;
