//! `SPS` - Sink Playback Switcher
//!
//! Switches the default sink of a PulseAudio or `PipeWire` (pipewire-pulse)
//! server to the next configured sink and moves every playback stream along,
//! optionally routing streams through a per-sink DSP sink.
//!
//! # Pipeline
//! - [`config`]: TOML file with the ordered sink list
//! - [`catalog`]: sink names resolved to live server identities
//! - [`resolver`]: which configured sink is active, which one is next
//! - [`router`]: fallback switch and per-stream moves
//! - [`server`]: the sound server seam ([`server::ServerView`]) and its `pactl` backend

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod notification;
pub mod resolver;
pub mod router;
pub mod server;
pub mod style;

/// Build-time information generated by `built`
#[allow(clippy::needless_raw_string_hashes, clippy::doc_markdown)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Re-export commonly used types for convenience
pub use catalog::{SinkCatalog, SinkDescriptor};
pub use cli::Args;
pub use config::Config;
pub use error::{Error, ResolutionError, Result};
