//! Sink resolution
//!
//! Decides which configured sink is active and which one a switch should go
//! to. Both decisions are pure functions of the catalog and a
//! [`ServerSnapshot`], so they never touch the server themselves.

use std::collections::HashSet;

use crate::catalog::{SinkCatalog, SinkDescriptor};
use crate::error::ResolutionError;
use crate::server::{ServerError, ServerView, SinkId};

/// Fallback sink and live sinks at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSnapshot {
    pub fallback: Option<SinkId>,
    pub sinks: HashSet<SinkId>,
}

impl ServerSnapshot {
    #[must_use]
    pub fn new(fallback: Option<SinkId>, sinks: impl IntoIterator<Item = SinkId>) -> Self {
        Self {
            fallback,
            sinks: sinks.into_iter().collect(),
        }
    }

    /// Query the server for a fresh snapshot
    ///
    /// # Errors
    /// Returns the server error if either query fails.
    pub async fn capture<S: ServerView>(server: &S) -> Result<Self, ServerError> {
        let fallback = server.current_fallback_sink().await?;
        let sinks = server.list_sinks().await?;
        Ok(Self::new(fallback, sinks))
    }

    #[must_use]
    pub fn is_live(&self, sink: &SinkId) -> bool {
        self.sinks.contains(sink)
    }

    #[must_use]
    pub fn is_fallback(&self, sink: &SinkId) -> bool {
        self.fallback.as_ref() == Some(sink)
    }
}

/// Matches catalog entries against server snapshots
#[derive(Debug, Clone, Copy)]
pub struct SinkResolver<'a> {
    catalog: &'a SinkCatalog,
}

impl<'a> SinkResolver<'a> {
    #[must_use]
    pub fn new(catalog: &'a SinkCatalog) -> Self {
        Self { catalog }
    }

    /// The configured sink that is the server's fallback sink
    ///
    /// # Errors
    /// [`ResolutionError::NoActiveSink`] if no entry matches.
    pub fn resolve_active(
        &self,
        snapshot: &ServerSnapshot,
    ) -> Result<&'a SinkDescriptor, ResolutionError> {
        self.catalog
            .iter()
            .find(|d| d.identity.as_ref().is_some_and(|id| snapshot.is_fallback(id)))
            .ok_or(ResolutionError::NoActiveSink)
    }

    /// The first configured sink, in declared order, that is live and not the fallback
    ///
    /// # Errors
    /// [`ResolutionError::NoAlternateSink`] if every entry is the fallback or not live.
    pub fn resolve_next(
        &self,
        snapshot: &ServerSnapshot,
    ) -> Result<&'a SinkDescriptor, ResolutionError> {
        self.catalog
            .iter()
            .find(|d| {
                d.identity
                    .as_ref()
                    .is_some_and(|id| !snapshot.is_fallback(id) && snapshot.is_live(id))
            })
            .ok_or(ResolutionError::NoAlternateSink)
    }
}
