//! Wire format shared by the server session and the client.
mod request;
mod response;
mod status;

pub use request::{Command, ParseError};
pub use response::{Response, ResponseReader};
pub use status::Status;

/// Longest request line the server accepts, not counting the terminator.
pub const MAX_REQUEST_LEN: usize = 1024;
