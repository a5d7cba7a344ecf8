//! In-process debugger reachable over a bounded channel.
//!
//! The store side records `init`/`send` calls as [`DevtoolsEvent`]s; the
//! client side reads them and posts protocol messages back.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::extension::{DevtoolsConnector, DevtoolsExtension, MessageHandler};
use super::options::DevtoolsOptions;
use super::protocol::{DevtoolsEvent, LOG_PREFIX};

struct Channel {
    sender: Sender<DevtoolsEvent>,
    handler: RwLock<Option<MessageHandler>>,
    connections: AtomicUsize,
    name: Mutex<Option<String>>,
}

impl Channel {
    fn try_send(&self, event: DevtoolsEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("{} event buffer full, dropping event", LOG_PREFIX);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Connector for an in-process debugger.
pub struct ChannelConnector {
    channel: Arc<Channel>,
}

impl ChannelConnector {
    /// Create a connector and the client end the debugger drives.
    pub fn new(buffer_size: usize) -> (Arc<Self>, DevtoolsClient) {
        let (sender, receiver) = bounded(buffer_size);
        let channel = Arc::new(Channel {
            sender,
            handler: RwLock::new(None),
            connections: AtomicUsize::new(0),
            name: Mutex::new(None),
        });
        let connector = Arc::new(Self {
            channel: Arc::clone(&channel),
        });
        (connector, DevtoolsClient { channel, receiver })
    }
}

impl DevtoolsConnector for ChannelConnector {
    fn connect(&self, options: &DevtoolsOptions) -> Option<Arc<dyn DevtoolsExtension>> {
        *self.channel.name.lock() = options.name.clone();
        self.channel.connections.fetch_add(1, Ordering::SeqCst);
        debug!(name = ?options.name, "{} channel connected", LOG_PREFIX);
        Some(Arc::new(ChannelExtension {
            channel: Arc::clone(&self.channel),
        }))
    }
}

struct ChannelExtension {
    channel: Arc<Channel>,
}

impl DevtoolsExtension for ChannelExtension {
    fn init(&self, state: &Value) {
        self.channel.try_send(DevtoolsEvent::Init {
            state: state.clone(),
        });
    }

    fn send(&self, action: Option<&Value>, state: &Value) {
        self.channel.try_send(DevtoolsEvent::Send {
            action: action.cloned(),
            state: state.clone(),
        });
    }

    fn subscribe(&self, handler: MessageHandler) {
        *self.channel.handler.write() = Some(handler);
    }
}

/// The debugger's end of a [`ChannelConnector`].
pub struct DevtoolsClient {
    channel: Arc<Channel>,
    receiver: Receiver<DevtoolsEvent>,
}

impl DevtoolsClient {
    /// Deliver a protocol message to the connected store.
    ///
    /// Returns `false` if no store has subscribed yet.
    pub fn post(&self, message: &Value) -> bool {
        let handler = self.channel.handler.read().clone();
        match handler {
            Some(handler) => {
                handler(message);
                true
            }
            None => false,
        }
    }

    /// Receive the next event (blocking).
    pub fn recv_timeout(&self, timeout: Duration) -> Result<DevtoolsEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<DevtoolsEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Every event currently buffered.
    pub fn drain(&self) -> Vec<DevtoolsEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn connections(&self) -> usize {
        self.channel.connections.load(Ordering::SeqCst)
    }

    /// Name passed by the most recent connection.
    pub fn connection_name(&self) -> Option<String> {
        self.channel.name.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_round_trip_through_channel() {
        let (connector, client) = ChannelConnector::new(8);
        let extension = connector
            .connect(&DevtoolsOptions::default().name("app"))
            .unwrap();

        extension.init(&json!({"n": 0}));
        extension.send(Some(&json!({"type": "inc"})), &json!({"n": 1}));

        assert_eq!(client.connections(), 1);
        assert_eq!(client.connection_name().as_deref(), Some("app"));
        assert_eq!(
            client.drain(),
            vec![
                DevtoolsEvent::Init { state: json!({"n": 0}) },
                DevtoolsEvent::Send {
                    action: Some(json!({"type": "inc"})),
                    state: json!({"n": 1})
                },
            ]
        );
    }

    #[test]
    fn test_full_buffer_drops_events() {
        let (connector, client) = ChannelConnector::new(1);
        let extension = connector.connect(&DevtoolsOptions::default()).unwrap();

        extension.init(&json!(1));
        extension.init(&json!(2));

        assert_eq!(client.drain(), vec![DevtoolsEvent::Init { state: json!(1) }]);
    }

    #[test]
    fn test_post_without_subscriber() {
        let (connector, client) = ChannelConnector::new(1);
        assert!(!client.post(&json!({"type": "DISPATCH"})));

        let extension = connector.connect(&DevtoolsOptions::default()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        extension.subscribe(Arc::new(move |message: &Value| sink.lock().push(message.clone())));

        assert!(client.post(&json!({"type": "DISPATCH"})));
        assert_eq!(seen.lock().len(), 1);
    }
}
