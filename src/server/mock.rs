//! In-memory sound server for testing without a running daemon.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{ServerError, ServerView, SinkId, StreamId};

/// A mutating call recorded by [`MockServer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCall {
    SetFallbackSink(SinkId),
    MoveStream(StreamId, SinkId),
    LoadModule(String),
}

#[derive(Debug, Clone)]
struct MockSink {
    id: SinkId,
    name: String,
    driver: String,
    properties: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct MockStream {
    id: StreamId,
    driver: String,
    sink: Option<SinkId>,
}

#[derive(Debug, Default)]
struct MockState {
    sinks: Vec<MockSink>,
    streams: Vec<MockStream>,
    /// Streams that show up once the fallback sink changes
    late_streams: Vec<MockStream>,
    fallback: Option<SinkId>,
    modules: HashSet<String>,
    fail_module_load: bool,
    /// Clients are refused until this module is loaded
    required_module: Option<String>,
    fail_set_fallback: bool,
    fail_moves: HashSet<StreamId>,
    calls: Vec<ServerCall>,
}

/// A scriptable sound server
///
/// Built with the `with_*` methods, then handed to the resolver/router by
/// reference. Every mutating call is recorded and can be inspected with
/// [`MockServer::calls`].
///
/// # Example
///
/// ```
/// use sps::server::{MockServer, SinkId};
///
/// let server = MockServer::new()
///     .with_sink("sinkA", "speakers", "module-alsa-card.c")
///     .with_sink("sinkB", "headphones", "module-alsa-card.c")
///     .with_fallback("sinkA");
///
/// assert_eq!(server.fallback(), Some(SinkId::new("sinkA")));
/// ```
#[derive(Debug)]
pub struct MockServer {
    state: Mutex<MockState>,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// An empty server that accepts clients and has no modules loaded
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_sink(self, id: &str, name: &str, driver: &str) -> Self {
        self.state().sinks.push(MockSink {
            id: SinkId::new(id),
            name: name.to_string(),
            driver: driver.to_string(),
            properties: HashMap::new(),
        });
        self
    }

    /// Attach a property to a sink added earlier
    #[must_use]
    pub fn with_sink_property(self, id: &str, key: &str, value: &str) -> Self {
        if let Some(sink) = self.state().sinks.iter_mut().find(|s| s.id.as_str() == id) {
            sink.properties.insert(key.to_string(), value.to_string());
        }
        self
    }

    #[must_use]
    pub fn with_stream(self, id: &str, driver: &str) -> Self {
        self.state().streams.push(MockStream {
            id: StreamId::new(id),
            driver: driver.to_string(),
            sink: None,
        });
        self
    }

    /// A stream that only appears after the fallback sink has been changed
    #[must_use]
    pub fn with_stream_after_switch(self, id: &str, driver: &str) -> Self {
        self.state().late_streams.push(MockStream {
            id: StreamId::new(id),
            driver: driver.to_string(),
            sink: None,
        });
        self
    }

    #[must_use]
    pub fn with_fallback(self, id: &str) -> Self {
        self.state().fallback = Some(SinkId::new(id));
        self
    }

    #[must_use]
    pub fn with_module(self, module: &str) -> Self {
        self.state().modules.insert(module.to_string());
        self
    }

    /// Refuse clients until `module` has been loaded
    #[must_use]
    pub fn requiring_module(self, module: &str) -> Self {
        self.state().required_module = Some(module.to_string());
        self
    }

    #[must_use]
    pub fn failing_module_load(self) -> Self {
        self.state().fail_module_load = true;
        self
    }

    #[must_use]
    pub fn failing_set_fallback(self) -> Self {
        self.state().fail_set_fallback = true;
        self
    }

    #[must_use]
    pub fn failing_move(self, stream: &str) -> Self {
        self.state().fail_moves.insert(StreamId::new(stream));
        self
    }

    /// Mutating calls in the order they were made
    #[must_use]
    pub fn calls(&self) -> Vec<ServerCall> {
        self.state().calls.clone()
    }

    #[must_use]
    pub fn fallback(&self) -> Option<SinkId> {
        self.state().fallback.clone()
    }

    /// Sink a stream was last moved to (`None` if never moved)
    #[must_use]
    pub fn stream_sink(&self, stream: &str) -> Option<SinkId> {
        self.state()
            .streams
            .iter()
            .find(|s| s.id.as_str() == stream)
            .and_then(|s| s.sink.clone())
    }

    fn with_sink_ref<T>(
        &self,
        sink: &SinkId,
        f: impl FnOnce(&MockSink) -> T,
    ) -> Result<T, ServerError> {
        self.state()
            .sinks
            .iter()
            .find(|s| &s.id == sink)
            .map(f)
            .ok_or_else(|| ServerError::UnknownSink(sink.to_string()))
    }
}

impl ServerView for MockServer {
    async fn list_sinks(&self) -> Result<Vec<SinkId>, ServerError> {
        Ok(self.state().sinks.iter().map(|s| s.id.clone()).collect())
    }

    async fn list_sink_names(&self) -> Result<Vec<(SinkId, String)>, ServerError> {
        Ok(self
            .state()
            .sinks
            .iter()
            .map(|s| (s.id.clone(), s.name.clone()))
            .collect())
    }

    async fn current_fallback_sink(&self) -> Result<Option<SinkId>, ServerError> {
        Ok(self.fallback())
    }

    async fn set_fallback_sink(&self, sink: &SinkId) -> Result<(), ServerError> {
        let mut state = self.state();
        if state.fail_set_fallback {
            return Err(ServerError::Failed {
                command: format!("set-default-sink {sink}"),
                stderr: "mock failure".to_string(),
            });
        }
        if !state.sinks.iter().any(|s| &s.id == sink) {
            return Err(ServerError::UnknownSink(sink.to_string()));
        }
        state.fallback = Some(sink.clone());
        state.calls.push(ServerCall::SetFallbackSink(sink.clone()));
        let late = std::mem::take(&mut state.late_streams);
        state.streams.extend(late);
        Ok(())
    }

    async fn sink_name(&self, sink: &SinkId) -> Result<String, ServerError> {
        self.with_sink_ref(sink, |s| s.name.clone())
    }

    async fn sink_driver(&self, sink: &SinkId) -> Result<String, ServerError> {
        self.with_sink_ref(sink, |s| s.driver.clone())
    }

    async fn sink_properties(
        &self,
        sink: &SinkId,
    ) -> Result<HashMap<String, String>, ServerError> {
        self.with_sink_ref(sink, |s| s.properties.clone())
    }

    async fn list_playback_streams(&self) -> Result<Vec<StreamId>, ServerError> {
        Ok(self.state().streams.iter().map(|s| s.id.clone()).collect())
    }

    async fn stream_driver(&self, stream: &StreamId) -> Result<String, ServerError> {
        self.state()
            .streams
            .iter()
            .find(|s| &s.id == stream)
            .map(|s| s.driver.clone())
            .ok_or_else(|| ServerError::UnknownStream(stream.to_string()))
    }

    async fn move_stream(&self, stream: &StreamId, sink: &SinkId) -> Result<(), ServerError> {
        let mut state = self.state();
        if state.fail_moves.contains(stream) {
            return Err(ServerError::Failed {
                command: format!("move-sink-input {stream} {sink}"),
                stderr: "mock failure".to_string(),
            });
        }
        if !state.sinks.iter().any(|s| &s.id == sink) {
            return Err(ServerError::UnknownSink(sink.to_string()));
        }
        let entry = state
            .streams
            .iter_mut()
            .find(|s| &s.id == stream)
            .ok_or_else(|| ServerError::UnknownStream(stream.to_string()))?;
        entry.sink = Some(sink.clone());
        state
            .calls
            .push(ServerCall::MoveStream(stream.clone(), sink.clone()));
        Ok(())
    }

    async fn is_module_loaded(&self, module: &str) -> Result<bool, ServerError> {
        Ok(self.state().modules.contains(module))
    }

    async fn load_module(&self, module: &str) -> Result<(), ServerError> {
        let mut state = self.state();
        if state.fail_module_load {
            return Err(ServerError::Failed {
                command: format!("load-module {module}"),
                stderr: "mock failure".to_string(),
            });
        }
        state.modules.insert(module.to_string());
        state.calls.push(ServerCall::LoadModule(module.to_string()));
        Ok(())
    }

    async fn ping(&self) -> Result<(), ServerError> {
        let state = self.state();
        match &state.required_module {
            Some(module) if !state.modules.contains(module) => Err(ServerError::Failed {
                command: "info".to_string(),
                stderr: "Connection refused".to_string(),
            }),
            _ => Ok(()),
        }
    }
}
