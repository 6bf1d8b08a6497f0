//! A TCP connection to one `{host,port}` broker (§4.3.2). Transport errors
//! are the only errors leader discovery swallows (§7).

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default socket timeout on the low-level Kafka client (§5).
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 63356;

pub struct BrokerConnection {
    stream: TcpStream,
}

impl BrokerConnection {
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr).map_err(|e| Error::Transport(e.to_string()))?;
        stream.set_read_timeout(Some(timeout)).map_err(Error::from)?;
        stream.set_write_timeout(Some(timeout)).map_err(Error::from)?;
        stream.set_nodelay(true).ok();
        Ok(BrokerConnection { stream })
    }

    pub fn connect_default(host: &str, port: u16) -> Result<Self> {
        Self::connect(host, port, Duration::from_millis(DEFAULT_SOCKET_TIMEOUT_MS))
    }

    /// Write the framed request (already length-prefixed) and read back a
    /// length-prefixed response.
    pub fn send_receive(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.stream
            .write_all(request)
            .map_err(|e| Error::Transport(e.to_string()))?;

        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .map_err(|e| Error::Transport(e.to_string()))?;
        let len = i32::from_be_bytes(len_buf);
        if len < 0 {
            return Err(Error::Protocol(format!("negative response length {len}")));
        }
        let mut body = vec![0u8; len as usize];
        self.stream
            .read_exact(&mut body)
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(body)
    }
}
