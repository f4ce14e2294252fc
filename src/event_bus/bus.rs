use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, oneshot},
    task,
};

use super::event::Event;
use super::sink::{ChannelSink, EventSink, MemorySink, StdOutSink};

/// Declarative sink selection carried by
/// [`RunConfig`](crate::runner::RunConfig).
///
/// `Memory` and `Channel` hold live handles so the caller keeps access to
/// what the run emits: a `MemorySink` clone shares its captured event list,
/// and a `Channel` sender streams events to the paired receiver.
#[derive(Clone, Debug)]
pub enum SinkConfig {
    StdOut,
    /// Stdout as one JSON object per line, for log shippers.
    StdOutJson,
    Memory(MemorySink),
    Channel(mpsc::UnboundedSender<Event>),
}

/// How the runner should assemble its [`EventBus`].
#[derive(Clone, Debug)]
pub struct EventBusConfig {
    pub sinks: Vec<SinkConfig>,
}

impl EventBusConfig {
    #[must_use]
    pub fn with_stdout_only() -> Self {
        Self {
            sinks: vec![SinkConfig::StdOut],
        }
    }

    #[must_use]
    pub fn silent() -> Self {
        Self { sinks: Vec::new() }
    }

    #[must_use]
    pub fn add_sink(mut self, sink: SinkConfig) -> Self {
        // At most one sink per stdout flavor; handle-carrying sinks may
        // repeat.
        let duplicate_stdout = match sink {
            SinkConfig::StdOut => self.sinks.iter().any(|s| matches!(s, SinkConfig::StdOut)),
            SinkConfig::StdOutJson => self
                .sinks
                .iter()
                .any(|s| matches!(s, SinkConfig::StdOutJson)),
            _ => false,
        };
        if duplicate_stdout {
            return self;
        }
        self.sinks.push(sink);
        self
    }

    /// Materialize the bus described by this configuration.
    #[must_use]
    pub fn build_event_bus(&self) -> EventBus {
        let sinks: Vec<Box<dyn EventSink>> = self
            .sinks
            .iter()
            .map(|sink| match sink {
                SinkConfig::StdOut => Box::new(StdOutSink::default()) as Box<dyn EventSink>,
                SinkConfig::StdOutJson => {
                    Box::new(StdOutSink::with_formatter(crate::telemetry::JsonFormatter))
                        as Box<dyn EventSink>
                }
                SinkConfig::Memory(memory) => Box::new(memory.clone()) as Box<dyn EventSink>,
                SinkConfig::Channel(tx) => {
                    Box::new(ChannelSink::new(tx.clone())) as Box<dyn EventSink>
                }
            })
            .collect();
        EventBus::with_sinks(sinks)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::with_stdout_only()
    }
}

/// Receives events from producers and broadcasts them to all sinks.
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    event_channel: (flume::Sender<Event>, flume::Receiver<Event>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    /// Create an EventBus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create an EventBus with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            event_channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink (useful for per-request streaming).
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().push(Box::new(sink));
    }

    /// Get a clone of the sender side so producers can emit events.
    #[must_use]
    pub fn get_sender(&self) -> flume::Sender<Event> {
        self.event_channel.0.clone()
    }

    /// Spawn a background task that listens for events and broadcasts to all
    /// sinks. Idempotent: calling multiple times has no effect.
    pub fn listen_for_events(&self) {
        let mut guard = self.listener.lock();
        if guard.is_some() {
            return; // Already listening
        }

        let receiver = self.event_channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break, // all senders dropped
                        Ok(event) => {
                            let mut sinks_guard = sinks.lock();
                            for sink in sinks_guard.iter_mut() {
                                if let Err(e) = sink.handle(&event) {
                                    tracing::warn!(error = %e, "event sink error");
                                }
                            }
                        }
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the background listener task, draining events already queued.
    pub async fn stop_listener(&self) {
        let state = self.listener.lock().take();
        if let Some(state) = state {
            // Drain the queue before signalling shutdown so late events
            // emitted just before the run finished still reach the sinks.
            while let Ok(event) = self.event_channel.1.try_recv() {
                let mut sinks_guard = self.sinks.lock();
                for sink in sinks_guard.iter_mut() {
                    if let Err(e) = sink.handle(&event) {
                        tracing::warn!(error = %e, "event sink error");
                    }
                }
            }
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Some(state) = self.listener.lock().take() {
            let _ = state.shutdown_tx.send(());
            state.handle.abort();
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
