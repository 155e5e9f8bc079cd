//! Terminal styling utilities
//!
//! Color scheme for CLI output:
//! - Yellow for the sink label in the status line
//! - Cyan bold for headers
//! - Green / cyan / red for active / available / missing sinks
//! - Dark yellow for a missing DSP sink
//!
//! crossterm honors `NO_COLOR`, so piping output stays plain when asked.

use crossterm::style::Stylize;

/// Extension trait for SPS output roles
///
/// # Examples
///
/// ```
/// use sps::style::SpsStyle;
///
/// println!("Now playing via {}.", "Headphones".label());
/// println!("{}", "CONFIGURED SINKS:".header());
/// ```
pub trait SpsStyle: Stylize + Sized {
    /// The sink label in `Now playing via <label>.`
    fn label(self) -> Self::Styled {
        self.yellow()
    }

    fn header(self) -> <Self::Styled as Stylize>::Styled
    where
        Self::Styled: Stylize,
    {
        self.cyan().bold()
    }

    /// Sink is the current fallback
    fn active(self) -> Self::Styled {
        self.green()
    }

    /// Sink is live but not the fallback
    fn available(self) -> Self::Styled {
        self.cyan()
    }

    /// Sink (or its DSP sink) is not on the server
    fn missing(self) -> Self::Styled {
        self.red()
    }

    fn degraded(self) -> Self::Styled {
        self.dark_yellow()
    }
}

impl<T: Stylize> SpsStyle for T {}
