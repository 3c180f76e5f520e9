use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use flatfs::{BlockStore, FileSys};

use crate::error::SessionError;
use crate::session::Session;

/// Accepts clients one at a time; there is never more than one session per
/// mounted file system.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> std::io::Result<Server> {
        let listener = TcpListener::bind(addr)?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Server { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next client and serves it until it leaves.
    pub fn serve_one<S: BlockStore>(&self, fs: &mut FileSys<S>) -> Result<(), SessionError> {
        let (stream, peer) = self.listener.accept().map_err(SessionError::Accept)?;
        info!("client {} connected", peer);

        let reader = BufReader::new(stream.try_clone()?);
        let result = Session::new(fs, reader, stream).run();
        match &result {
            Ok(()) => info!("client {} disconnected", peer),
            Err(err) => warn!("session with {} ended: {}", peer, err),
        }
        result
    }
}
