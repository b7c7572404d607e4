//! ZeroMQ `SUB` socket subscription

use tracing::{debug, info, trace};

use crate::config::ReceiverConfig;
use crate::subscription::{Endpoint, RawMessage, Subscription, SubscriptionState};
use crate::{ConnectError, ReceiveError};

/// Subscription backed by a ZeroMQ `SUB` socket with its own context.
///
/// The socket subscribes to every topic and is created with `LINGER = 0`, so
/// teardown never waits on the network.
pub struct ZmqSubscription {
    /// Socket, present while connected
    socket: Option<zmq::Socket>,

    /// Context owned exclusively by this subscription
    context: Option<zmq::Context>,

    /// Endpoint of the current or most recent connection
    endpoint: Option<String>,

    /// Receive queue bound applied on connect
    receive_high_water_mark: Option<i32>,
}

impl ZmqSubscription {
    /// Create a disconnected subscription.
    pub fn new(config: &ReceiverConfig) -> Self {
        Self {
            socket: None,
            context: None,
            endpoint: None,
            receive_high_water_mark: config.receive_high_water_mark,
        }
    }

    /// Create and connect in one step.
    pub fn connect_to(endpoint: &str, config: &ReceiverConfig) -> Result<Self, ConnectError> {
        let mut subscription = Self::new(config);
        subscription.connect(endpoint)?;
        Ok(subscription)
    }

    fn open_socket(&self, endpoint: &Endpoint) -> Result<(zmq::Context, zmq::Socket), ConnectError> {
        let context = zmq::Context::new();
        let transport =
            |operation, source| ConnectError::transport(endpoint.as_str(), operation, source);

        let socket = context.socket(zmq::SUB).map_err(|e| transport("socket", e))?;
        socket.set_linger(0).map_err(|e| transport("set linger", e))?;
        if let Some(hwm) = self.receive_high_water_mark {
            socket.set_rcvhwm(hwm).map_err(|e| transport("set receive high-water mark", e))?;
        }
        socket.set_subscribe(b"").map_err(|e| transport("subscribe", e))?;
        socket.connect(endpoint.as_str()).map_err(|e| transport("connect", e))?;

        Ok((context, socket))
    }
}

impl Subscription for ZmqSubscription {
    fn connect(&mut self, endpoint: &str) -> Result<(), ConnectError> {
        if let (Some(_), Some(current)) = (&self.socket, &self.endpoint) {
            return Err(ConnectError::AlreadyConnected { endpoint: current.clone() });
        }

        let endpoint = Endpoint::parse(endpoint)?;
        let (context, socket) = self.open_socket(&endpoint)?;

        self.context = Some(context);
        self.socket = Some(socket);
        self.endpoint = Some(endpoint.as_str().to_string());

        info!(endpoint = %endpoint, "Subscribed to all topics");
        Ok(())
    }

    fn state(&self) -> SubscriptionState {
        if self.socket.is_some() {
            SubscriptionState::Connected
        } else {
            SubscriptionState::Disconnected
        }
    }

    fn has_pending(&mut self) -> bool {
        let Some(socket) = &self.socket else {
            return false;
        };

        match socket.get_events() {
            Ok(events) => events.contains(zmq::POLLIN),
            Err(e) => {
                debug!("Reading socket events failed: {}", e);
                false
            }
        }
    }

    fn receive_one(&mut self) -> Result<RawMessage, ReceiveError> {
        let socket = self.socket.as_ref().ok_or(ReceiveError::NotConnected)?;

        let parts = match socket.recv_multipart(zmq::DONTWAIT) {
            Ok(parts) => parts,
            Err(zmq::Error::EAGAIN) => {
                trace!("Pending message already drained");
                return Err(ReceiveError::WouldBlock);
            }
            Err(e) => return Err(ReceiveError::Transport(e)),
        };

        match <[Vec<u8>; 2]>::try_from(parts) {
            Ok([header, payload]) => {
                trace!(header_len = header.len(), payload_len = payload.len(), "Received message");
                Ok(RawMessage { header, payload })
            }
            Err(parts) => Err(ReceiveError::UnexpectedParts { parts: parts.len() }),
        }
    }

    fn disconnect(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };

        if let Some(endpoint) = &self.endpoint {
            if let Err(e) = socket.disconnect(endpoint) {
                // The peer may never have appeared; the socket is closed either way
                debug!(endpoint = %endpoint, "zmq disconnect reported: {}", e);
            }
        }

        // Socket must close before its context terminates
        drop(socket);
        drop(self.context.take());

        info!(endpoint = self.endpoint.as_deref().unwrap_or("<unknown>"), "Disconnected");
    }

    fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

impl Drop for ZmqSubscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}
