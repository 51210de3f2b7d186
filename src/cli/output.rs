//! Output formatting for the CLI.
//!
//! Provides dual-mode output that works for both humans and machines.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use std::str::FromStr;

/// Environment variable overriding the detected output format.
pub const ENV_OUTPUT_FORMAT: &str = "MUST_ASSERT_OUTPUT_FORMAT";

/// Output format selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable with colors and formatting.
    #[default]
    Human,

    /// Compact JSON, one document per line.
    Json,

    /// Pretty-printed JSON.
    JsonPretty,
}

impl OutputFormat {
    /// Detect appropriate format based on environment.
    ///
    /// Uses JSON when:
    /// - `MUST_ASSERT_OUTPUT_FORMAT` is set to a JSON variant
    /// - `CI` environment variable is set
    /// - stdout is not a TTY (piped output)
    #[must_use]
    pub fn auto_detect() -> Self {
        if let Some(format) = std::env::var(ENV_OUTPUT_FORMAT)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            return format;
        }
        if std::env::var("CI").is_ok() || !io::stdout().is_terminal() {
            return Self::Json;
        }
        Self::Human
    }

    /// Check if this format produces JSON output.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" | "json_pretty" => Ok(Self::JsonPretty),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Color choice for output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorChoice {
    /// Automatically detect based on terminal.
    #[default]
    Auto,

    /// Always use colors.
    Always,

    /// Never use colors.
    Never,
}

impl ColorChoice {
    /// Detect appropriate color setting based on environment.
    ///
    /// Respects `NO_COLOR` (<https://no-color.org/>) and `CLICOLOR_FORCE`.
    #[must_use]
    pub fn auto_detect() -> Self {
        if std::env::var("NO_COLOR").is_ok() {
            return Self::Never;
        }
        if std::env::var("CLICOLOR_FORCE").is_ok() {
            return Self::Always;
        }
        if io::stdout().is_terminal() {
            Self::Auto
        } else {
            Self::Never
        }
    }

    /// Check if colors should be used.
    #[must_use]
    pub fn should_colorize(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => io::stdout().is_terminal(),
        }
    }
}

/// Trait for types that can be output in multiple formats.
pub trait Outputtable: Serialize {
    /// Human-readable representation.
    fn human_format(&self, color: bool) -> String;
}

/// Output writer that handles format switching.
pub struct Output {
    format: OutputFormat,
    color: ColorChoice,
    writer: Box<dyn Write>,
}

impl Output {
    /// Create a new output writer to stdout.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            color: ColorChoice::auto_detect(),
            writer: Box::new(io::stdout()),
        }
    }

    /// Create with a custom writer.
    #[must_use]
    pub fn with_writer<W: Write + 'static>(format: OutputFormat, writer: W) -> Self {
        Self {
            format,
            color: ColorChoice::Never,
            writer: Box::new(writer),
        }
    }

    /// Set the color choice.
    #[must_use]
    pub fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Get the output format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write a single value.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or serialization fails.
    pub fn write<T: Outputtable>(&mut self, value: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Human => {
                let text = value.human_format(self.color.should_colorize());
                write!(self.writer, "{text}")?;
                if !text.ends_with('\n') {
                    writeln!(self.writer)?;
                }
            }
            OutputFormat::Json => {
                let json = serde_json::to_string(value)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(self.writer, "{json}")?;
            }
            OutputFormat::JsonPretty => {
                let json = serde_json::to_string_pretty(value)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(self.writer, "{json}")?;
            }
        }
        Ok(())
    }

    /// Flush the output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Serialize)]
    struct TestItem {
        id: u32,
        name: String,
    }

    impl Outputtable for TestItem {
        fn human_format(&self, _color: bool) -> String {
            format!("Item {}: {}", self.id, self.name)
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn render(format: OutputFormat) -> String {
        let buf = SharedBuf::default();
        let mut output = Output::with_writer(format, buf.clone());
        output
            .write(&TestItem {
                id: 1,
                name: "one".into(),
            })
            .expect("write");
        let bytes = buf.0.lock().clone();
        String::from_utf8(bytes).expect("utf8")
    }

    #[test]
    fn human_and_json_outputs() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("human_and_json_outputs");
        assert_eq!(render(OutputFormat::Human), "Item 1: one\n");
        assert_eq!(render(OutputFormat::Json), "{\"id\":1,\"name\":\"one\"}\n");
        assert!(render(OutputFormat::JsonPretty).contains("\n  \"id\": 1"));
        crate::test_complete!("human_and_json_outputs");
    }

    #[test]
    fn format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("json-pretty".parse::<OutputFormat>(), Ok(OutputFormat::JsonPretty));
        assert!("tsv".parse::<OutputFormat>().is_err());
        assert!(OutputFormat::JsonPretty.is_json());
        assert!(!OutputFormat::Human.is_json());
    }

    #[test]
    fn color_choice_fixed_values() {
        assert!(ColorChoice::Always.should_colorize());
        assert!(!ColorChoice::Never.should_colorize());
    }
}
