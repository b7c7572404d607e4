//! ZeroMQ `PUB` socket that emits frames in the wire format the receiver reads

use tracing::{debug, info};

use crate::codec::{RawMessage, encode_frame};
use crate::subscription::Endpoint;
use crate::types::Frame;
use crate::{ConnectError, LiveViewError};

/// Producer side of a live view stream.
///
/// Used by the `publish` command and by tests; a real detector or camera
/// pipeline would normally be the producer.
pub struct FramePublisher {
    // Field order matters: the socket must drop before its context
    socket: zmq::Socket,
    _context: zmq::Context,
    endpoint: String,
    sent: u64,
}

impl FramePublisher {
    /// Bind a `PUB` socket. `tcp://127.0.0.1:*` picks an ephemeral port; read it
    /// back with [`endpoint`](Self::endpoint).
    pub fn bind(endpoint: &str) -> Result<Self, ConnectError> {
        let parsed = Endpoint::parse(endpoint)?;
        let transport = |operation, source| ConnectError::transport(parsed.as_str(), operation, source);

        let context = zmq::Context::new();
        let socket = context.socket(zmq::PUB).map_err(|e| transport("socket", e))?;
        socket.set_linger(0).map_err(|e| transport("set linger", e))?;
        socket.bind(parsed.as_str()).map_err(|e| transport("bind", e))?;

        let endpoint = match socket.get_last_endpoint() {
            Ok(Ok(resolved)) => resolved,
            _ => parsed.as_str().to_string(),
        };

        info!(endpoint = %endpoint, "Publisher bound");
        Ok(Self { socket, _context: context, endpoint, sent: 0 })
    }

    /// Endpoint actually bound, with any wildcard port resolved
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Messages sent so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Encode and send one frame.
    pub fn publish(&mut self, frame: &Frame) -> Result<(), LiveViewError> {
        let message = encode_frame(frame).map_err(LiveViewError::Encode)?;
        self.send_raw(&message)
    }

    /// Send a pre-built two-part message.
    pub fn send_raw(&mut self, message: &RawMessage) -> Result<(), LiveViewError> {
        self.socket
            .send_multipart([message.header.as_slice(), message.payload.as_slice()], 0)
            .map_err(|source| LiveViewError::Publish { endpoint: self.endpoint.clone(), source })?;
        self.sent += 1;
        debug!(sent = self.sent, payload_len = message.payload.len(), "Published frame");
        Ok(())
    }
}
