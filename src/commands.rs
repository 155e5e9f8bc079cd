//! CLI commands
//!
//! `check` reports the active configured sink, `switch` moves to the next one,
//! `list` shows every configured sink with its live status. Each command
//! returns data; the `print_*` functions render it for the terminal.

use color_eyre::eyre;
use crossterm::style::Stylize;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{SinkCatalog, SinkDescriptor};
use crate::error::Result;
use crate::notification::{self, SinkIcon};
use crate::resolver::{ServerSnapshot, SinkResolver};
use crate::router::{RouteReport, StreamRouter};
use crate::server::ServerView;
use crate::style::SpsStyle;

// ============================================================================
// Results
// ============================================================================

/// Result of `check` or `switch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub label: String,
    pub sink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsp: Option<String>,
    pub switched: bool,
    #[serde(flatten)]
    pub report: RouteReport,
}

impl Outcome {
    fn from_descriptor(descriptor: &SinkDescriptor, switched: bool, report: RouteReport) -> Self {
        Self {
            label: descriptor.label.clone(),
            sink: descriptor.name.clone(),
            dsp: descriptor.dsp_name.clone(),
            switched,
            report,
        }
    }

    /// Plain status line, e.g. `Now playing via Headphones.`
    #[must_use]
    pub fn message(&self) -> String {
        format!("Now playing via {}.", self.label)
    }
}

/// Live status of a configured sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkStatus {
    Active,
    Available,
    NotFound,
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkListing {
    pub index: usize,
    pub label: String,
    pub sink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsp: Option<String>,
    pub dsp_available: bool,
    pub status: SinkStatus,
}

// ============================================================================
// Commands
// ============================================================================

/// Report the active configured sink without changing anything
///
/// # Errors
/// Returns an error if the server cannot be queried or no configured sink is active.
pub async fn check<S: ServerView>(catalog: &SinkCatalog, server: &S) -> Result<Outcome> {
    let snapshot = ServerSnapshot::capture(server).await?;
    let active = SinkResolver::new(catalog).resolve_active(&snapshot)?;
    Ok(Outcome::from_descriptor(active, false, RouteReport::default()))
}

/// Switch to the next configured sink and move all playback streams
///
/// # Errors
/// Returns an error if no alternate sink is available or any server call fails.
pub async fn switch<S: ServerView>(catalog: &SinkCatalog, server: &S) -> Result<Outcome> {
    let snapshot = ServerSnapshot::capture(server).await?;
    let target = SinkResolver::new(catalog).resolve_next(&snapshot)?;
    info!("Switching to: {}", target.label);

    let report = StreamRouter::new(server).apply(target).await?;
    info!(
        "Moved {} streams ({} via DSP)",
        report.streams_moved, report.streams_via_dsp
    );
    Ok(Outcome::from_descriptor(target, true, report))
}

/// Describe every configured sink against the live server
///
/// # Errors
/// Returns an error if the server cannot be queried.
pub async fn list<S: ServerView>(catalog: &SinkCatalog, server: &S) -> Result<Vec<SinkListing>> {
    let snapshot = ServerSnapshot::capture(server).await?;

    Ok(catalog
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let status = match &d.identity {
                Some(id) if snapshot.is_fallback(id) => SinkStatus::Active,
                Some(id) if snapshot.is_live(id) => SinkStatus::Available,
                _ => SinkStatus::NotFound,
            };
            SinkListing {
                index: i + 1,
                label: d.label.clone(),
                sink: d.name.clone(),
                dsp: d.dsp_name.clone(),
                dsp_available: d.dsp_identity.as_ref().is_some_and(|id| snapshot.is_live(id)),
                status,
            }
        })
        .collect())
}

/// Desktop notification for a completed switch (failures are only logged)
pub fn notify_switch(outcome: &Outcome) {
    let icon = SinkIcon::for_sink(&outcome.label, &outcome.sink);
    if let Err(e) = notification::notify(&outcome.label, icon) {
        warn!("Notification failed: {}", e);
    }
}

// ============================================================================
// Output
// ============================================================================

/// Print `Now playing via <label>.` (or JSON)
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn print_outcome(outcome: &Outcome, json_output: bool) -> eyre::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        println!("Now playing via {}.", outcome.label.as_str().label());
    }
    Ok(())
}

/// Print the configured sinks (or JSON)
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn print_listing(listing: &[SinkListing], json_output: bool) -> eyre::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(listing)?);
        return Ok(());
    }

    println!("{}", "CONFIGURED SINKS:".header());
    println!("{}", "-".repeat(17));
    for row in listing {
        let status = match row.status {
            SinkStatus::Active => "active".active().to_string(),
            SinkStatus::Available => "available".available().to_string(),
            SinkStatus::NotFound => "not found".missing().to_string(),
        };
        println!(
            "  {}. \"{}\" - {}",
            row.index.to_string().dim(),
            row.label,
            status
        );
        println!("     {}", row.sink.as_str().bold());
        if let Some(ref dsp) = row.dsp {
            let dsp_status = if row.dsp_available {
                String::new()
            } else {
                format!(" ({})", "not found".degraded())
            };
            println!("     {} {}{}", "dsp:".dim(), dsp, dsp_status);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ResolutionError};
    use crate::server::{MockServer, ServerCall, SinkId};
    use pretty_assertions::assert_eq;

    fn catalog() -> SinkCatalog {
        SinkCatalog::from_descriptors(vec![
            SinkDescriptor::new("sinkA", Some(SinkId::new("sinkA")), "Speakers"),
            SinkDescriptor::new("sinkB", Some(SinkId::new("sinkB")), "Headphones"),
        ])
    }

    fn server(fallback: &str) -> MockServer {
        MockServer::new()
            .with_sink("sinkA", "sinkA", "module-alsa-card.c")
            .with_sink("sinkB", "sinkB", "module-alsa-card.c")
            .with_fallback(fallback)
    }

    #[tokio::test]
    async fn test_switch_toggles_to_other_sink() {
        let server = server("sinkA");
        let outcome = switch(&catalog(), &server).await.unwrap();

        assert_eq!(outcome.message(), "Now playing via Headphones.");
        assert!(outcome.switched);
        assert_eq!(server.fallback(), Some(SinkId::new("sinkB")));
    }

    #[tokio::test]
    async fn test_check_reports_without_mutation() {
        let server = server("sinkB");
        let outcome = check(&catalog(), &server).await.unwrap();

        assert_eq!(outcome.message(), "Now playing via Headphones.");
        assert!(!outcome.switched);
        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn test_check_unknown_active_sink() {
        let server = server("sinkA").with_sink("sinkZ", "sinkZ", "x").with_fallback("sinkZ");
        let err = check(&catalog(), &server).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::NoActiveSink)
        ));
    }

    #[tokio::test]
    async fn test_switch_single_active_entry_fails_without_mutation() {
        let catalog = SinkCatalog::from_descriptors(vec![SinkDescriptor::new(
            "sinkA",
            Some(SinkId::new("sinkA")),
            "Speakers",
        )]);
        let server = server("sinkA");

        let err = switch(&catalog, &server).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::NoAlternateSink)
        ));
        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn test_switch_reports_moves() {
        let server = server("sinkA").with_stream("1", "protocol-native.c");
        let outcome = switch(&catalog(), &server).await.unwrap();
        assert_eq!(outcome.report.streams_moved, 1);
        assert_eq!(
            server.calls().last(),
            Some(&ServerCall::MoveStream("1".into(), SinkId::new("sinkB")))
        );
    }

    #[tokio::test]
    async fn test_list_statuses() {
        let catalog = SinkCatalog::from_descriptors(vec![
            SinkDescriptor::new("sinkA", Some(SinkId::new("sinkA")), "Speakers"),
            SinkDescriptor::new("sinkB", Some(SinkId::new("sinkB")), "Headphones")
                .with_dsp("eq", None),
            SinkDescriptor::new("usb", None, "USB"),
        ]);
        let listing = list(&catalog, &server("sinkA")).await.unwrap();

        let statuses: Vec<_> = listing.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                SinkStatus::Active,
                SinkStatus::Available,
                SinkStatus::NotFound
            ]
        );
        assert_eq!(listing[1].dsp.as_deref(), Some("eq"));
        assert!(!listing[1].dsp_available);
        assert_eq!(listing[2].index, 3);
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = Outcome {
            label: "Studio".to_string(),
            sink: "alsa_output.studio".to_string(),
            dsp: None,
            switched: true,
            report: RouteReport {
                streams_moved: 3,
                streams_via_dsp: 0,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "label": "Studio",
                "sink": "alsa_output.studio",
                "switched": true,
                "streams_moved": 3,
                "streams_via_dsp": 0
            })
        );
    }
}
