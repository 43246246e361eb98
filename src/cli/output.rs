//! Colored terminal output for scenario runs

use crate::scenario::{ScenarioExample, ScenarioReport, Step};
use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            quiet,
        }
    }

    fn line(&self, marker: &str, spec: Option<ColorSpec>, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        if let Some(spec) = &spec {
            let _ = buffer.set_color(spec);
        }
        let _ = write!(&mut buffer, "{marker}");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, " {message}");
        self.bufwtr.print(&buffer)
    }

    /// Print an info message
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        self.line("ℹ", Some(ColorSpec::new().set_fg(Some(Color::Cyan)).clone()), message)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.line(
            "✓",
            Some(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true).clone()),
            message,
        )
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.line(
            "⚠",
            Some(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true).clone()),
            message,
        )
    }

    /// Print an error message (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        if buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true)).is_err()
            || write!(&mut buffer, "✗").is_err()
            || buffer.reset().is_err()
            || writeln!(&mut buffer, " {message}").is_err()
            || bufwtr.print(&buffer).is_err()
        {
            // Stderr failed - fallback to stdout as last resort
            println!("[STDERR ERROR] ✗ {message}");
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(&mut buffer, "═══ {title} ═══");
        let _ = buffer.reset();
        self.bufwtr.print(&buffer)
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.line("   ", None, message)
    }

    /// Print a plain message
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "{message}");
        self.bufwtr.print(&buffer)
    }

    /// One Examples row as `[index] vendor_type/vendor: message`
    pub fn example(&self, index: usize, example: &ScenarioExample) -> std::io::Result<()> {
        self.println(&format!(
            "[{index}] {}/{}: {}",
            example.vendor_type, example.vendor, example.message
        ))
    }

    /// Steps, verdict, and teardown warnings of a finished run
    pub fn report(&self, report: &ScenarioReport) -> std::io::Result<()> {
        for step in Step::ALL {
            if report.steps_completed.contains(&step) {
                self.success(step.description())?;
            } else {
                self.indent(&format!("- {}", step.description()))?;
            }
        }
        for warning in &report.teardown_warnings {
            self.warn(&format!("teardown: {warning}"))?;
        }

        match &report.outcome {
            Ok(()) => self.success(&format!(
                "{}/{} passed",
                report.example.vendor_type, report.example.vendor
            )),
            Err(e) => {
                self.error(&format!(
                    "{}/{} failed ({:?}): {e}",
                    report.example.vendor_type,
                    report.example.vendor,
                    e.category()
                ));
                for suggestion in e.recovery_suggestions() {
                    self.indent(&format!("💡 {suggestion}"))?;
                }
                Ok(())
            }
        }
    }
}
