//! Stream routing
//!
//! Makes a descriptor the fallback sink and moves every live playback stream
//! onto it. When the descriptor has a DSP sink, streams whose driver differs
//! from the DSP sink's own driver are sent through the DSP; streams sharing its
//! driver (the DSP's own loopback output) go straight to the primary sink so
//! they cannot feed back into the DSP.
//!
//! Failures before the fallback change leave the server untouched. After it,
//! the first failing move aborts the rest; streams already moved stay moved.

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::SinkDescriptor;
use crate::error::{ResolutionError, Result};
use crate::server::{ServerError, ServerView, SinkId, StreamId};

/// Destination of one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMove {
    pub stream: StreamId,
    pub destination: SinkId,
    pub via_dsp: bool,
}

/// All moves for one switch, computed before any stream is touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePlan {
    pub moves: Vec<StreamMove>,
}

/// What a completed switch did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteReport {
    pub streams_moved: usize,
    pub streams_via_dsp: usize,
}

/// Primary sink plus the DSP sink and the driver that identifies it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub primary: SinkId,
    pub dsp: Option<(SinkId, String)>,
}

impl RouteTarget {
    /// Where a stream with `stream_driver` goes
    #[must_use]
    pub fn destination(&self, stream_driver: &str) -> (&SinkId, bool) {
        match &self.dsp {
            Some((dsp, dsp_driver)) if stream_driver != dsp_driver => (dsp, true),
            _ => (&self.primary, false),
        }
    }
}

/// Applies a switch through a [`ServerView`]
#[derive(Debug, Clone, Copy)]
pub struct StreamRouter<'a, S> {
    server: &'a S,
}

impl<'a, S: ServerView> StreamRouter<'a, S> {
    #[must_use]
    pub fn new(server: &'a S) -> Self {
        Self { server }
    }

    /// Resolve the descriptor's sinks and the DSP driver, without mutating anything
    ///
    /// # Errors
    /// [`ResolutionError::Unresolved`] if the primary sink is not live,
    /// [`ServerError::SinkNotFound`] if a declared DSP sink is not live, or any
    /// server error from the driver query.
    pub async fn target(&self, descriptor: &SinkDescriptor) -> Result<RouteTarget> {
        let primary = descriptor
            .identity
            .clone()
            .ok_or_else(|| ResolutionError::Unresolved(descriptor.name.clone()))?;

        let dsp = match (&descriptor.dsp_name, &descriptor.dsp_identity) {
            (_, Some(dsp)) => {
                let driver = self.server.sink_driver(dsp).await?;
                Some((dsp.clone(), driver))
            }
            (Some(name), None) => return Err(ServerError::SinkNotFound(name.clone()).into()),
            (None, None) => None,
        };

        Ok(RouteTarget { primary, dsp })
    }

    /// Compute a destination for every stream that is live right now
    ///
    /// # Errors
    /// Returns the server error if streams or their drivers cannot be queried.
    pub async fn plan(&self, target: &RouteTarget) -> Result<RoutePlan> {
        let streams = self.server.list_playback_streams().await?;
        let mut moves = Vec::with_capacity(streams.len());

        for stream in streams {
            let (destination, via_dsp) = if target.dsp.is_some() {
                let driver = self.server.stream_driver(&stream).await?;
                target.destination(&driver)
            } else {
                (&target.primary, false)
            };
            moves.push(StreamMove {
                stream,
                destination: destination.clone(),
                via_dsp,
            });
        }

        Ok(RoutePlan { moves })
    }

    /// Make `descriptor` the fallback sink and move all playback streams to it
    ///
    /// # Errors
    /// Any error from [`StreamRouter::target`] (server untouched), from setting
    /// the fallback sink, from planning, or from the first failing move.
    pub async fn apply(&self, descriptor: &SinkDescriptor) -> Result<RouteReport> {
        let target = self.target(descriptor).await?;

        self.server.set_fallback_sink(&target.primary).await?;
        info!("Fallback sink: {} ({})", descriptor.label, target.primary);

        let plan = self.plan(&target).await?;
        let mut report = RouteReport::default();
        for mv in &plan.moves {
            self.server.move_stream(&mv.stream, &mv.destination).await?;
            debug!(
                "Moved stream {} → {}{}",
                mv.stream,
                mv.destination,
                if mv.via_dsp { " (dsp)" } else { "" }
            );
            report.streams_moved += 1;
            if mv.via_dsp {
                report.streams_via_dsp += 1;
            }
        }

        Ok(report)
    }
}
