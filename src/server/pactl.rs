//! `pactl` backend
//!
//! Talks to PulseAudio (or `PipeWire` through pipewire-pulse) with the `pactl`
//! command-line tool:
//! - `pactl --format=json info`: connectivity check and default sink name
//! - `pactl --format=json list sinks|sink-inputs|modules`: enumeration
//! - `pactl set-default-sink`, `move-sink-input`, `load-module`: commands
//!
//! Sink and stream identities are the server's numeric indices. Every call
//! runs under a deadline; a `pactl` that does not answer is killed.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::{debug, trace};

use super::{ServerError, ServerView, SinkId, StreamId};

// ============================================================================
// pactl JSON structures
// ============================================================================

/// Subset of `pactl --format=json info`
#[derive(Debug, Deserialize)]
pub struct PaServerInfo {
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub server_version: Option<String>,
    #[serde(default)]
    pub default_sink_name: Option<String>,
}

/// One entry of `pactl --format=json list sinks`
#[derive(Debug, Deserialize)]
pub struct PaSink {
    pub index: u32,
    pub name: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl PaSink {
    /// Property list flattened to strings (`pactl` emits strings, but be lenient)
    #[must_use]
    pub fn string_properties(&self) -> HashMap<String, String> {
        self.properties
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// One entry of `pactl --format=json list sink-inputs`
#[derive(Debug, Deserialize)]
pub struct PaSinkInput {
    pub index: u32,
    #[serde(default)]
    pub driver: Option<String>,
}

/// One entry of `pactl --format=json list modules`
#[derive(Debug, Deserialize)]
pub struct PaModule {
    pub name: String,
}

fn parse_json<T: DeserializeOwned>(command: &str, stdout: &[u8]) -> Result<T, ServerError> {
    serde_json::from_slice(stdout).map_err(|source| ServerError::Parse {
        command: command.to_string(),
        source,
    })
}

fn find_sink<'a>(sinks: &'a [PaSink], id: &SinkId) -> Result<&'a PaSink, ServerError> {
    sinks
        .iter()
        .find(|s| s.index.to_string() == id.as_str())
        .ok_or_else(|| ServerError::UnknownSink(id.to_string()))
}

// ============================================================================
// PulseServer
// ============================================================================

/// Sound server reached through `pactl`
#[derive(Debug, Clone)]
pub struct PulseServer {
    program: String,
    timeout: Duration,
}

impl PulseServer {
    /// Create a backend without contacting the server
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "pactl".to_string(),
            timeout,
        }
    }

    /// Use a different executable instead of `pactl` from `PATH`
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.program.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the tool and return its stdout
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ServerError> {
        let command = self.command_line(args);
        trace!("Running: {}", command);

        let mut cmd = Command::new(&self.program);
        cmd.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ServerError::Timeout {
                command: command.clone(),
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|source| ServerError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServerError::Failed {
                command,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    async fn query<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, ServerError> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("--format=json");
        full.extend_from_slice(args);
        let stdout = self.run(&full).await?;
        parse_json(&self.command_line(&full), &stdout)
    }

    async fn info(&self) -> Result<PaServerInfo, ServerError> {
        self.query(&["info"]).await
    }

    async fn sinks(&self) -> Result<Vec<PaSink>, ServerError> {
        let sinks: Vec<PaSink> = self.query(&["list", "sinks"]).await?;
        trace!("pactl reported {} sinks", sinks.len());
        Ok(sinks)
    }

    async fn sink_inputs(&self) -> Result<Vec<PaSinkInput>, ServerError> {
        self.query(&["list", "sink-inputs"]).await
    }
}

impl ServerView for PulseServer {
    async fn list_sinks(&self) -> Result<Vec<SinkId>, ServerError> {
        Ok(self
            .sinks()
            .await?
            .iter()
            .map(|s| SinkId::new(s.index.to_string()))
            .collect())
    }

    async fn list_sink_names(&self) -> Result<Vec<(SinkId, String)>, ServerError> {
        Ok(self
            .sinks()
            .await?
            .into_iter()
            .map(|s| (SinkId::new(s.index.to_string()), s.name))
            .collect())
    }

    async fn current_fallback_sink(&self) -> Result<Option<SinkId>, ServerError> {
        let Some(default_name) = self.info().await?.default_sink_name else {
            return Ok(None);
        };
        let sinks = self.sinks().await?;
        let fallback = sinks
            .iter()
            .find(|s| s.name == default_name)
            .map(|s| SinkId::new(s.index.to_string()));
        if fallback.is_none() {
            debug!("Default sink '{}' is not in the sink list", default_name);
        }
        Ok(fallback)
    }

    async fn set_fallback_sink(&self, sink: &SinkId) -> Result<(), ServerError> {
        let name = self.sink_name(sink).await?;
        self.run(&["set-default-sink", name.as_str()]).await?;
        debug!("Set default sink: {}", name);
        Ok(())
    }

    async fn sink_name(&self, sink: &SinkId) -> Result<String, ServerError> {
        let sinks = self.sinks().await?;
        Ok(find_sink(&sinks, sink)?.name.clone())
    }

    async fn sink_driver(&self, sink: &SinkId) -> Result<String, ServerError> {
        let sinks = self.sinks().await?;
        Ok(find_sink(&sinks, sink)?.driver.clone().unwrap_or_default())
    }

    async fn sink_properties(
        &self,
        sink: &SinkId,
    ) -> Result<HashMap<String, String>, ServerError> {
        let sinks = self.sinks().await?;
        Ok(find_sink(&sinks, sink)?.string_properties())
    }

    async fn list_playback_streams(&self) -> Result<Vec<StreamId>, ServerError> {
        Ok(self
            .sink_inputs()
            .await?
            .iter()
            .map(|s| StreamId::new(s.index.to_string()))
            .collect())
    }

    async fn stream_driver(&self, stream: &StreamId) -> Result<String, ServerError> {
        self.sink_inputs()
            .await?
            .into_iter()
            .find(|s| s.index.to_string() == stream.as_str())
            .map(|s| s.driver.unwrap_or_default())
            .ok_or_else(|| ServerError::UnknownStream(stream.to_string()))
    }

    async fn move_stream(&self, stream: &StreamId, sink: &SinkId) -> Result<(), ServerError> {
        self.run(&["move-sink-input", stream.as_str(), sink.as_str()])
            .await?;
        Ok(())
    }

    async fn is_module_loaded(&self, module: &str) -> Result<bool, ServerError> {
        let modules: Vec<PaModule> = self.query(&["list", "modules"]).await?;
        Ok(modules.iter().any(|m| m.name == module))
    }

    async fn load_module(&self, module: &str) -> Result<(), ServerError> {
        self.run(&["load-module", module]).await?;
        debug!("Loaded module {}", module);
        Ok(())
    }

    async fn ping(&self) -> Result<(), ServerError> {
        let info = self.info().await?;
        debug!(
            "Connected to {} {}",
            info.server_name.as_deref().unwrap_or("sound server"),
            info.server_version.as_deref().unwrap_or("")
        );
        Ok(())
    }
}
