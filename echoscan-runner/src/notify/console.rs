//! Console notifier: writes alerts to stdout (or any writer).

use std::io::{self, Write};
use std::sync::Mutex;

use super::{NotifyError, Notifier};

const SEPARATOR: &str = "────────────────────────────────────────";

/// Writes each alert followed by a separator line.
pub struct ConsoleNotifier<W: Write + Send = io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleNotifier<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleNotifier<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> Notifier for ConsoleNotifier<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn destination(&self) -> &str {
        "stdout"
    }

    fn send(&self, message: &str) -> Result<(), NotifyError> {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(out, "{message}")?;
        writeln!(out, "{SEPARATOR}")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_message_and_separator() {
        let notifier = ConsoleNotifier::new(Vec::new());
        notifier.send("*SIGNAL* one").unwrap();
        notifier.send("two").unwrap();
        let text = String::from_utf8(notifier.into_inner()).unwrap();
        assert_eq!(text.matches(SEPARATOR).count(), 2);
        assert!(text.starts_with("*SIGNAL* one\n"));
        assert!(text.contains("\ntwo\n"));
    }
}
