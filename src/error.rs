//! Error types
//!
//! Every operation returns a typed [`Error`]; only the binary turns one into a
//! terminal exit. Server backends report [`ServerError`], which this module
//! wraps according to the phase it happened in (bootstrap vs. routing).

use std::path::PathBuf;

use crate::server::ServerError;

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal errors for one invocation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file is missing or unreadable.
    #[error("config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The configuration parsed but describes an unusable catalog.
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// The sound server could not be reached or the control module could not be loaded.
    #[error("cannot connect to the sound server: {0}")]
    Connection(#[source] ServerError),

    /// No configured sink fits the request.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A server query or command failed while resolving or moving streams.
    #[error(transparent)]
    Routing(#[from] ServerError),
}

/// Why a sink could not be selected from the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("no configured sink matches the active device")]
    NoActiveSink,

    #[error("no other configured sink is available to switch to")]
    NoAlternateSink,

    /// The descriptor never matched a live sink.
    #[error("sink '{0}' is not available on the sound server")]
    Unresolved(String),
}
