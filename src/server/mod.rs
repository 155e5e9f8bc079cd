//! Sound server access
//!
//! [`ServerView`] is the capability set the switcher needs from a running sound
//! server: enumerate sinks and playback streams, read names, drivers and
//! property lists, change the fallback sink and move streams. Every call is a
//! fresh round-trip; nothing is cached between calls because streams come and
//! go while the tool runs.
//!
//! Backends:
//! - [`pactl::PulseServer`]: PulseAudio or pipewire-pulse through `pactl`
//! - [`MockServer`]: in-memory server used by tests

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use crate::error::{Error, Result};

mod mock;
pub mod pactl;

pub use mock::{MockServer, ServerCall};

// ============================================================================
// Identities
// ============================================================================

/// Opaque handle of a sink, only meaningful within one server session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(String);

/// Opaque handle of a playback stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(String);

macro_rules! opaque_id {
    ($ty:ident) => {
        impl $ty {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

opaque_id!(SinkId);
opaque_id!(StreamId);

// ============================================================================
// Errors
// ============================================================================

/// Failure of a single server round-trip
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' did not answer within {after_ms}ms")]
    Timeout { command: String, after_ms: u64 },

    #[error("'{command}' failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("unexpected output from '{command}': {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no sink with id {0}")]
    UnknownSink(String),

    #[error("no playback stream with id {0}")]
    UnknownStream(String),

    /// A sink declared by name is not present on the server.
    #[error("could not find sink '{0}'")]
    SinkNotFound(String),
}

// ============================================================================
// Capability set
// ============================================================================

/// Live view of a sound server plus the commands the switcher issues
///
/// Calls are awaited one after another; there is never more than one request
/// in flight.
#[allow(async_fn_in_trait)]
pub trait ServerView {
    /// Identities of all sinks currently known to the server
    async fn list_sinks(&self) -> Result<Vec<SinkId>, ServerError>;

    /// Every sink paired with its server-side name, from one enumeration
    async fn list_sink_names(&self) -> Result<Vec<(SinkId, String)>, ServerError>;

    /// The fallback (default) sink, if the server has one
    async fn current_fallback_sink(&self) -> Result<Option<SinkId>, ServerError>;

    async fn set_fallback_sink(&self, sink: &SinkId) -> Result<(), ServerError>;

    /// Server-side name of a sink (e.g. `alsa_output.pci-0000_00_1f.3.analog-stereo`)
    async fn sink_name(&self, sink: &SinkId) -> Result<String, ServerError>;

    async fn sink_driver(&self, sink: &SinkId) -> Result<String, ServerError>;

    async fn sink_properties(&self, sink: &SinkId)
    -> Result<HashMap<String, String>, ServerError>;

    /// Identities of all live playback streams
    async fn list_playback_streams(&self) -> Result<Vec<StreamId>, ServerError>;

    async fn stream_driver(&self, stream: &StreamId) -> Result<String, ServerError>;

    async fn move_stream(&self, stream: &StreamId, sink: &SinkId) -> Result<(), ServerError>;

    /// Whether a server module with this name is loaded
    async fn is_module_loaded(&self, module: &str) -> Result<bool, ServerError>;

    async fn load_module(&self, module: &str) -> Result<(), ServerError>;

    /// Round-trip that only succeeds when the server accepts clients
    async fn ping(&self) -> Result<(), ServerError>;
}

/// Load `module` unless the server already has it
///
/// Idempotent: does nothing when the module is already present.
///
/// # Errors
/// Returns [`Error::Connection`] if the server cannot be queried or the module
/// fails to load.
pub async fn bootstrap<S: ServerView>(server: &S, module: &str) -> Result<()> {
    if server
        .is_module_loaded(module)
        .await
        .map_err(Error::Connection)?
    {
        debug!("Module {} already loaded", module);
        return Ok(());
    }

    info!("Loading module {}", module);
    server.load_module(module).await.map_err(Error::Connection)
}

/// Prepare the server for this run
///
/// The control module (if any) is loaded first; the ping runs
/// after it, since the module may be what lets clients in.
///
/// # Errors
/// Returns [`Error::Connection`] if bootstrapping or the ping fails.
pub async fn connect<S: ServerView>(server: &S, control_module: Option<&str>) -> Result<()> {
    if let Some(module) = control_module {
        bootstrap(server, module).await?;
    }
    server.ping().await.map_err(Error::Connection)
}
