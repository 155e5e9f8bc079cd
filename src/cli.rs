//! Command-line interface definitions
//!
//! Uses clap for argument parsing with derive macros.

use clap::Parser;
use std::path::PathBuf;

/// SPS - Sink Playback Switcher
///
/// Switch the default audio sink to the next configured one and move every
/// playback stream along with it.
#[derive(Debug, Parser)]
#[command(name = "sps")]
#[command(version)]
#[command(about = "Sink Playback Switcher - Toggle the default audio sink and move playback streams")]
#[command(after_help = "\
BEHAVIOR:
  - Without flags, switches to the first configured sink that is available
    and not currently active (with two sinks this is a toggle)
  - All playback streams follow the new sink
  - A sink with a 'dsp' sink routes streams through it, except streams that
    share the DSP sink's driver, which go straight to the sink

CONFIG:
  $XDG_CONFIG_HOME/sps/config.toml (or ~/.sps/config.toml)

SOUND SERVER:
  Uses pactl; works with PulseAudio and PipeWire (pipewire-pulse).")]
pub struct Args {
    /// Report the current sink without switching
    #[arg(short, long, group = "mode")]
    pub check: bool,

    /// List configured sinks and whether they are available
    #[arg(short, long, group = "mode")]
    pub list: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Read the configuration from PATH
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// What the invocation should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Switch,
    Check,
    List,
}

impl Args {
    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.check {
            Mode::Check
        } else if self.list {
            Mode::List
        } else {
            Mode::Switch
        }
    }
}
