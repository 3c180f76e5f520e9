use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::error::ProtocolError;
use crate::proto::{Command, Response, ResponseReader};

/// The remote end of a mounted file system.
pub struct Client {
    reader: ResponseReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Client, ProtocolError> {
        let stream = TcpStream::connect(addr)?;
        debug!("connected to {}", stream.peer_addr()?);
        Ok(Client {
            reader: ResponseReader::new(stream.try_clone()?),
            writer: stream,
        })
    }

    /// Sends one request and waits for its response.
    pub fn send(&mut self, command: &Command) -> Result<Response, ProtocolError> {
        self.writer.write_all(command.to_line().as_bytes())?;
        self.writer.flush()?;
        let response = self.reader.read_response()?;
        trace!("{} -> {} ({} byte body)", command, response.status, response.body.len());
        Ok(response)
    }

    /// Closes both directions of the connection.
    pub fn disconnect(self) -> Result<(), ProtocolError> {
        self.writer.shutdown(Shutdown::Both)?;
        Ok(())
    }
}
