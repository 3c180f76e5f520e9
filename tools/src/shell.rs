use std::io::{BufRead, Write};

use flatfs_net::proto::{Command, ParseError, Response};
use flatfs_net::{Client, ProtocolError};

const PROMPT: &str = "NFS> ";

/// Anything that can carry a command to a file system and bring back its
/// response.
pub trait Remote {
    fn send(&mut self, command: &Command) -> Result<Response, ProtocolError>;
}

impl Remote for Client {
    fn send(&mut self, command: &Command) -> Result<Response, ProtocolError> {
        Client::send(self, command)
    }
}

/// Command line front end. Lines are checked locally before anything goes
/// over the wire.
pub struct Shell<C, W> {
    remote: C,
    out: W,
}

impl<C: Remote, W: Write> Shell<C, W> {
    pub fn new(remote: C, out: W) -> Self {
        Shell { remote, out }
    }

    pub fn into_parts(self) -> (C, W) {
        (self.remote, self.out)
    }

    /// Reads commands until `quit` or end of input. With `echo` set, each line
    /// is printed after the prompt, which is how scripts are replayed.
    pub fn run<R: BufRead>(&mut self, input: R, echo: bool) -> Result<(), ProtocolError> {
        let mut lines = input.lines();
        loop {
            if !echo {
                write!(self.out, "{}", PROMPT)?;
                self.out.flush()?;
            }
            let line = match lines.next() {
                Some(line) => line?,
                None => return Ok(()),
            };
            if echo {
                writeln!(self.out, "{}{}", PROMPT, line)?;
            }
            if self.execute(&line)? {
                return Ok(());
            }
        }
    }

    /// Runs one line. Returns true once the user has quit.
    pub fn execute(&mut self, line: &str) -> Result<bool, ProtocolError> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(ParseError::Empty) => return Ok(false),
            Err(err) => {
                writeln!(self.out, "Invalid command line: {}", err)?;
                return Ok(false);
            }
        };

        let response = self.remote.send(&command)?;
        self.print(&response)?;
        Ok(command == Command::Quit)
    }

    fn print(&mut self, response: &Response) -> Result<(), ProtocolError> {
        if !response.status.is_ok() {
            writeln!(self.out, "{}", response.status)?;
            return Ok(());
        }
        self.out.write_all(&response.body)?;
        if !response.body.is_empty() && !response.body.ends_with(b"\n") {
            writeln!(self.out)?;
        }
        Ok(())
    }
}
