//! Remote access to a [`flatfs`] volume over a line-oriented request/response
//! protocol with length-framed responses.
#[macro_use]
extern crate log;

mod client;
mod error;
pub mod proto;
mod server;
mod session;

pub use crate::client::Client;
pub use crate::error::{ProtocolError, SessionError};
pub use crate::server::Server;
pub use crate::session::{dispatch, Session};
