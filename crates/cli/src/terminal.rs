//! Terminal adapters for the UI-facing ports.
//!
//! A command-line caller has no toast area and no router: notifications are
//! written to stderr and a login redirect is printed for the user to follow.

use std::io::Write;
use std::sync::Mutex;

use pipeline::{Navigator, Notifier};

/// Writes each notification as one line to stderr.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Reports a fixed current location and prints redirect targets.
pub struct TerminalNavigator<W> {
    location: String,
    out: Mutex<W>,
}

impl TerminalNavigator<std::io::Stdout> {
    /// Creates a navigator printing to stdout.
    pub fn stdout(location: impl Into<String>) -> Self {
        Self::new(location, std::io::stdout())
    }
}

impl<W> TerminalNavigator<W> {
    pub fn new(location: impl Into<String>, out: W) -> Self {
        Self {
            location: location.into(),
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> Navigator for TerminalNavigator<W> {
    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn redirect(&self, target: &str) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(err) = writeln!(out, "redirect: {target}") {
            tracing::warn!(error = %err, "failed to print redirect target");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_redirect_line() {
        let navigator = TerminalNavigator::new("/docs/1", Vec::new());
        assert_eq!(navigator.current_location(), "/docs/1");

        navigator.redirect("/login?redirect=%2Fdocs%2F1");

        let printed = String::from_utf8(navigator.into_inner()).unwrap();
        assert_eq!(printed, "redirect: /login?redirect=%2Fdocs%2F1\n");
    }
}
