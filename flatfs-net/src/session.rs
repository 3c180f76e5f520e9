use std::io::{BufRead, Read, Write};

use flatfs::{BlockStore, FileSys, FsError, Listing};

use crate::error::{ProtocolError, SessionError};
use crate::proto::{Command, Response, Status, MAX_REQUEST_LEN};

/// Runs one command against the file system and builds its response.
/// Request errors become status codes; faults are handed back to the caller.
pub fn dispatch<S: BlockStore>(
    fs: &mut FileSys<S>,
    command: &Command,
) -> Result<Response, FsError> {
    let unit = |()| -> Vec<u8> { Vec::new() };
    let result = match command {
        Command::Mkdir(name) => fs.mkdir(name).map(unit),
        Command::Cd(name) => fs.cd(name).map(unit),
        Command::Home => {
            fs.home();
            Ok(Vec::new())
        }
        Command::Rmdir(name) => fs.rmdir(name).map(unit),
        Command::Ls => fs.ls().map(|listing| render_listing(&listing)),
        Command::Create(name) => fs.create(name).map(unit),
        Command::Append(name, data) => fs.append(name, data.as_bytes()).map(unit),
        Command::Cat(name) => fs.cat(name),
        Command::Head(name, count) => fs.head(name, *count as usize),
        Command::Rm(name) => fs.rm(name).map(unit),
        Command::Stat(name) => fs.stat(name).map(|stat| stat.to_string().into_bytes()),
        Command::Quit => Ok(Vec::new()),
    };

    match result {
        Ok(body) => Ok(Response::ok(body)),
        Err(err) => match Status::from_error(&err) {
            Some(status) => Ok(Response::empty(status)),
            None => Err(err),
        },
    }
}

fn render_listing(listing: &[Listing]) -> Vec<u8> {
    listing
        .iter()
        .map(|entry| format!("{}\n", entry))
        .collect::<String>()
        .into_bytes()
}

/// One connected client. Holds the transport and borrows the mounted file
/// system, whose cursor is the session's current directory.
pub struct Session<'a, S: BlockStore, R, W> {
    fs: &'a mut FileSys<S>,
    reader: R,
    writer: W,
}

impl<'a, S: BlockStore, R: BufRead, W: Write> Session<'a, S, R, W> {
    /// Starts a session in the home directory.
    pub fn new(fs: &'a mut FileSys<S>, reader: R, writer: W) -> Self {
        fs.home();
        Session { fs, reader, writer }
    }

    /// Serves requests until the client quits or disconnects.
    pub fn run(&mut self) -> Result<(), SessionError> {
        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("client closed the connection");
                    return Ok(());
                }
                Err(SessionError::Protocol(ProtocolError::RequestTooLong(limit))) => {
                    let err = ProtocolError::RequestTooLong(limit);
                    Response::new(Status::BadRequest, err.to_string().into_bytes())
                        .write_to(&mut self.writer)?;
                    return Err(err.into());
                }
                Err(err) => return Err(err),
            };

            let (response, quit) = self.handle(&line)?;
            response.write_to(&mut self.writer)?;
            if quit {
                debug!("client quit");
                return Ok(());
            }
        }
    }

    /// Parses and executes one raw request line. The flag is set once the
    /// client has asked to quit.
    pub fn handle(&mut self, line: &[u8]) -> Result<(Response, bool), FsError> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(_) => {
                return Ok((
                    Response::new(Status::BadRequest, b"request is not valid utf-8".to_vec()),
                    false,
                ))
            }
        };

        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(err) => {
                debug!("rejected request {:?}: {}", text.trim_end(), err);
                return Ok((
                    Response::new(Status::BadRequest, err.to_string().into_bytes()),
                    false,
                ));
            }
        };

        let response = dispatch(self.fs, &command).map_err(|err| {
            error!("{} failed: {}", command, err);
            err
        })?;
        info!("{} -> {}", command, response.status);
        Ok((response, command == Command::Quit))
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        // Room for the longest request plus "\r\n".
        let limit = (MAX_REQUEST_LEN + 2) as u64;
        let mut line = Vec::new();
        let read = (&mut self.reader).take(limit).read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(None);
        }
        if !line.ends_with(b"\n") && read as u64 == limit {
            return Err(ProtocolError::RequestTooLong(MAX_REQUEST_LEN).into());
        }
        Ok(Some(line))
    }
}
