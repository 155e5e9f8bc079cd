//! Sink catalog
//!
//! Turns the configured sink names into [`SinkDescriptor`]s carrying the
//! server's live identities. Names that match no live sink stay unresolved;
//! that only becomes an error if such a descriptor is picked as a target.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::{Config, Discovery, SinkEntry};
use crate::error::{Error, Result};
use crate::server::{ServerView, SinkId};

/// Sink property holding the display label (property discovery)
pub const LABEL_PROPERTY: &str = "sps.label";

/// Sink property holding the DSP sink's name (property discovery)
pub const DSP_PROPERTY: &str = "sps.dsp";

/// A configured sink resolved against the live server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkDescriptor {
    /// Declared sink name
    pub name: String,
    /// Live identity, `None` if no sink with that name exists right now
    pub identity: Option<SinkId>,
    /// Declared DSP sink name
    pub dsp_name: Option<String>,
    pub dsp_identity: Option<SinkId>,
    pub label: String,
}

impl SinkDescriptor {
    /// A descriptor without DSP routing
    #[must_use]
    pub fn new(name: &str, identity: Option<SinkId>, label: &str) -> Self {
        Self {
            name: name.to_string(),
            identity,
            dsp_name: None,
            dsp_identity: None,
            label: label.to_string(),
        }
    }

    /// Route through a DSP sink
    #[must_use]
    pub fn with_dsp(mut self, dsp_name: &str, dsp_identity: Option<SinkId>) -> Self {
        self.dsp_name = Some(dsp_name.to_string());
        self.dsp_identity = dsp_identity;
        self
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.identity.is_some()
    }
}

/// Ordered list of descriptors; order is the switching priority
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkCatalog {
    entries: Vec<SinkDescriptor>,
}

impl SinkCatalog {
    #[must_use]
    pub fn from_descriptors(entries: Vec<SinkDescriptor>) -> Self {
        Self { entries }
    }

    /// Resolve the configured sinks against the server
    ///
    /// # Errors
    /// Returns [`Error::Routing`] if the server cannot be enumerated, or
    /// [`Error::ConfigInvalid`] if a sink resolves to its own DSP.
    pub async fn load<S: ServerView>(config: &Config, server: &S) -> Result<Self> {
        Self::resolve(&config.sinks, config.settings.discovery, server).await
    }

    /// Resolve `entries` with the given discovery strategy
    ///
    /// # Errors
    /// See [`SinkCatalog::load`].
    pub async fn resolve<S: ServerView>(
        entries: &[SinkEntry],
        discovery: Discovery,
        server: &S,
    ) -> Result<Self> {
        let live = live_sinks_by_name(server).await?;

        let mut descriptors = Vec::with_capacity(entries.len());
        for entry in entries {
            let identity = live.get(&entry.sink).cloned();

            let (label, dsp_name) = match (discovery, &identity) {
                (Discovery::Properties, Some(id)) => {
                    let mut props = server.sink_properties(id).await?;
                    (
                        props
                            .remove(LABEL_PROPERTY)
                            .filter(|l| !l.is_empty())
                            .or_else(|| entry.label.clone()),
                        props
                            .remove(DSP_PROPERTY)
                            .filter(|d| !d.is_empty())
                            .or_else(|| entry.dsp.clone()),
                    )
                }
                _ => (entry.label.clone(), entry.dsp.clone()),
            };

            let dsp_identity = dsp_name.as_ref().and_then(|d| live.get(d).cloned());
            if identity.is_some() && dsp_identity.is_some() && identity == dsp_identity {
                return Err(Error::ConfigInvalid(format!(
                    "sink '{}' uses itself as its DSP sink",
                    entry.sink
                )));
            }

            if identity.is_none() {
                warn!("Configured sink '{}' is not available", entry.sink);
            }
            if let (Some(dsp), None) = (&dsp_name, &dsp_identity) {
                warn!("DSP sink '{}' for '{}' is not available", dsp, entry.sink);
            }

            descriptors.push(SinkDescriptor {
                name: entry.sink.clone(),
                identity,
                dsp_name,
                dsp_identity,
                label: label.unwrap_or_else(|| entry.sink.clone()),
            });
        }

        debug!(
            "Catalog: {} of {} sinks live",
            descriptors.iter().filter(|d| d.is_resolved()).count(),
            descriptors.len()
        );
        Ok(Self::from_descriptors(descriptors))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SinkDescriptor> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Name → identity for every live sink
async fn live_sinks_by_name<S: ServerView>(server: &S) -> Result<HashMap<String, SinkId>> {
    let sinks = server.list_sink_names().await?;
    let mut by_name = HashMap::with_capacity(sinks.len());
    for (id, name) in sinks {
        by_name.entry(name).or_insert(id);
    }
    Ok(by_name)
}
