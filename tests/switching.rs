//! End-to-end switching tests
//!
//! Drive the public pipeline (config → catalog → resolver → router) against the
//! in-memory server, the same way the binary drives it against `pactl`.

use pretty_assertions::assert_eq;
use sps::commands;
use sps::server::{MockServer, ServerCall, SinkId, StreamId};
use sps::{Config, Error, ResolutionError, SinkCatalog};

const SPEAKERS_HEADPHONES: &str = r#"
[[sinks]]
sink = "alsa_output.speakers"
label = "Speakers"

[[sinks]]
sink = "alsa_output.headphones"
label = "Headphones"
"#;

fn two_sink_server(fallback: &str) -> MockServer {
    MockServer::new()
        .with_sink("sinkA", "alsa_output.speakers", "module-alsa-card.c")
        .with_sink("sinkB", "alsa_output.headphones", "module-alsa-card.c")
        .with_fallback(fallback)
}

async fn catalog_for(toml: &str, server: &MockServer) -> SinkCatalog {
    let config = Config::from_toml(toml).expect("valid config");
    SinkCatalog::load(&config, server)
        .await
        .expect("catalog resolves")
}

#[tokio::test]
async fn switch_moves_to_next_configured_sink() {
    let server = two_sink_server("sinkA");
    let catalog = catalog_for(SPEAKERS_HEADPHONES, &server).await;

    let outcome = commands::switch(&catalog, &server).await.unwrap();

    assert_eq!(outcome.message(), "Now playing via Headphones.");
    assert_eq!(server.fallback(), Some(SinkId::new("sinkB")));
}

#[tokio::test]
async fn switching_twice_toggles_back() {
    let server = two_sink_server("sinkA");
    let catalog = catalog_for(SPEAKERS_HEADPHONES, &server).await;

    commands::switch(&catalog, &server).await.unwrap();
    let outcome = commands::switch(&catalog, &server).await.unwrap();

    assert_eq!(outcome.label, "Speakers");
    assert_eq!(server.fallback(), Some(SinkId::new("sinkA")));
}

#[tokio::test]
async fn check_reports_active_sink_without_mutation() {
    let server = two_sink_server("sinkB");
    let catalog = catalog_for(SPEAKERS_HEADPHONES, &server).await;

    let outcome = commands::check(&catalog, &server).await.unwrap();

    assert_eq!(outcome.message(), "Now playing via Headphones.");
    assert!(server.calls().is_empty());
}

#[tokio::test]
async fn dsp_sink_splits_streams_by_driver() {
    let server = MockServer::new()
        .with_sink("sinkA", "alsa_output.studio", "Y")
        .with_sink("sinkB", "alsa_output.other", "Y")
        .with_sink("sinkC", "effect_input.eq", "X")
        .with_fallback("sinkB")
        .with_stream("loopback", "X")
        .with_stream("player", "Y");
    let catalog = catalog_for(
        r#"
[[sinks]]
sink = "alsa_output.studio"
dsp = "effect_input.eq"
label = "Studio"
"#,
        &server,
    )
    .await;

    let outcome = commands::switch(&catalog, &server).await.unwrap();

    assert_eq!(outcome.message(), "Now playing via Studio.");
    assert_eq!(
        server.calls(),
        vec![
            ServerCall::SetFallbackSink(SinkId::new("sinkA")),
            ServerCall::MoveStream(StreamId::new("loopback"), SinkId::new("sinkA")),
            ServerCall::MoveStream(StreamId::new("player"), SinkId::new("sinkC")),
        ]
    );
    assert_eq!(outcome.report.streams_via_dsp, 1);
}

#[tokio::test]
async fn single_active_entry_fails_without_mutation() {
    let server = two_sink_server("sinkA");
    let catalog = catalog_for(
        "[[sinks]]\nsink = \"alsa_output.speakers\"\nlabel = \"Speakers\"\n",
        &server,
    )
    .await;

    let err = commands::switch(&catalog, &server).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Resolution(ResolutionError::NoAlternateSink)
    ));
    assert!(server.calls().is_empty());
}

#[tokio::test]
async fn unplugged_sink_is_skipped() {
    let server = two_sink_server("sinkA");
    let catalog = catalog_for(
        r#"
[[sinks]]
sink = "alsa_output.speakers"
label = "Speakers"

[[sinks]]
sink = "bluez_output.unplugged"
label = "Buds"

[[sinks]]
sink = "alsa_output.headphones"
label = "Headphones"
"#,
        &server,
    )
    .await;

    let outcome = commands::switch(&catalog, &server).await.unwrap();

    assert_eq!(outcome.label, "Headphones");
}

#[tokio::test]
async fn property_discovery_uses_server_labels() {
    let server = two_sink_server("sinkA")
        .with_sink_property("sinkB", "sps.label", "Desk Headset");
    let catalog = catalog_for(
        r#"
[settings]
discovery = "properties"

[[sinks]]
sink = "alsa_output.speakers"

[[sinks]]
sink = "alsa_output.headphones"
"#,
        &server,
    )
    .await;

    let outcome = commands::switch(&catalog, &server).await.unwrap();

    assert_eq!(outcome.message(), "Now playing via Desk Headset.");
}

#[tokio::test]
async fn list_marks_active_and_missing_sinks() {
    let server = two_sink_server("sinkB");
    let catalog = catalog_for(
        r#"
[[sinks]]
sink = "alsa_output.speakers"
label = "Speakers"

[[sinks]]
sink = "alsa_output.headphones"
label = "Headphones"

[[sinks]]
sink = "hdmi"
label = "TV"
"#,
        &server,
    )
    .await;

    let listing = commands::list(&catalog, &server).await.unwrap();
    let json = serde_json::to_value(&listing).unwrap();

    assert_eq!(json[0]["status"], "available");
    assert_eq!(json[1]["status"], "active");
    assert_eq!(json[2]["status"], "not_found");
}

#[tokio::test]
async fn empty_label_property_falls_back_to_configured_label() {
    let server = two_sink_server("sinkA").with_sink_property("sinkB", "sps.label", "");
    let catalog = catalog_for(
        r#"
[settings]
discovery = "properties"

[[sinks]]
sink = "alsa_output.speakers"
label = "Speakers"

[[sinks]]
sink = "alsa_output.headphones"
label = "Headphones"
"#,
        &server,
    )
    .await;

    let outcome = commands::switch(&catalog, &server).await.unwrap();

    assert_eq!(outcome.message(), "Now playing via Headphones.");
}
