pub mod channel;
pub mod driver;
pub mod error;
pub mod packet;
pub mod ping;
pub mod protocol;
pub mod resolve;
pub mod settings;

mod socket;
#[cfg(unix)]
#[path = "sys/unix.rs"]
mod sys;

pub use error::{Error, Result};
