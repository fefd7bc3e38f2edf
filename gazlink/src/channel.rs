//! Synchronous command channel over a local stream socket.
//!
//! The protocol is one exchange per command: send the token's ASCII bytes,
//! block until any reply arrives, treat any reply as success. Reply
//! contents are deliberately not inspected — the simulator's ack payload is
//! unspecified. Commands within one channel are strictly serialized by
//! `&mut self`; the two channels (world, model) are independent.

use crate::error::{BridgeError, BridgeResult};
use gaz::command::{ChannelScope, CommandToken};
use gaz::consts::ACK_BUFFER_SIZE;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;

/// One persistent command socket to the simulator.
pub struct CommandChannel {
    scope: ChannelScope,
    stream: UnixStream,
}

impl CommandChannel {
    /// Wrap a connected stream.
    pub fn new(scope: ChannelScope, stream: UnixStream) -> Self {
        Self { scope, stream }
    }

    /// Channel scope (world or model).
    pub fn scope(&self) -> ChannelScope {
        self.scope
    }

    /// Send one command token and block until the simulator acknowledges.
    ///
    /// Blocks indefinitely: there is no receive timeout, so callers must
    /// not expect bounded latency. A socket error or a peer close
    /// (zero-byte read) is fatal — the channel does not reconnect.
    pub fn send(&mut self, token: CommandToken) -> BridgeResult<()> {
        debug_assert_eq!(token.scope(), self.scope, "token routed to wrong channel");

        self.stream
            .write_all(token.as_bytes())
            .map_err(|source| BridgeError::ChannelClosed {
                scope: self.scope,
                source,
            })?;

        let mut ack = [0u8; ACK_BUFFER_SIZE];
        let n = self
            .stream
            .read(&mut ack)
            .map_err(|source| BridgeError::ChannelClosed {
                scope: self.scope,
                source,
            })?;

        if n == 0 {
            return Err(BridgeError::ChannelClosed {
                scope: self.scope,
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "simulator closed the command socket",
                ),
            });
        }

        tracing::trace!(token = token.as_str(), ack_bytes = n, "command acknowledged");
        Ok(())
    }
}
