//! Desktop notifications
//!
//! Announces a completed switch through notify-rust, with a `FreeDesktop`
//! icon guessed from the sink's label and server name.

use color_eyre::eyre::{Context, Result};
use notify_rust::Notification;

const SUMMARY: &str = "Audio Output";

/// `FreeDesktop` icon for an output device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkIcon {
    Display,
    Headphones,
    Speakers,
}

impl SinkIcon {
    /// Guess the device kind; matching is case-insensitive
    #[must_use]
    pub fn for_sink(label: &str, sink_name: &str) -> Self {
        let label = label.to_lowercase();
        let name = sink_name.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| label.contains(w));

        if any(&["hdmi", "tv", "display"]) || name.contains("hdmi") {
            Self::Display
        } else if any(&["headphone", "headset", "bluetooth"]) || name.contains("bluez") {
            Self::Headphones
        } else {
            Self::Speakers
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Display => "video-display",
            Self::Headphones => "audio-headphones",
            Self::Speakers => "audio-speakers",
        }
    }
}

/// Show `label` as the new output
///
/// # Errors
/// Returns an error if the notification cannot be sent (e.g., no notification daemon running).
pub fn notify(label: &str, icon: SinkIcon) -> Result<()> {
    Notification::new()
        .summary(SUMMARY)
        .body(label)
        .appname("SPS")
        .icon(icon.name())
        .timeout(3000)
        .show()
        .context("Failed to show notification")?;

    Ok(())
}
