use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::Result;

/// Log level configuration for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }

    /// Get the level as a string for env filter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

// Solarized Dark
const SOLARIZED_BASE02: Color = Color::Rgb(7, 54, 66);
const SOLARIZED_BASE01: Color = Color::Rgb(88, 110, 117);
const SOLARIZED_BASE0: Color = Color::Rgb(131, 148, 150);
const SOLARIZED_BASE1: Color = Color::Rgb(147, 161, 161);
const SOLARIZED_YELLOW: Color = Color::Rgb(181, 137, 0);
const SOLARIZED_RED: Color = Color::Rgb(220, 50, 47);
const SOLARIZED_MAGENTA: Color = Color::Rgb(211, 54, 130);
const SOLARIZED_GREEN: Color = Color::Rgb(133, 153, 0);

/// Prefix used for failures printed by the binary.
pub const ERROR_PREFIX: &str = "❌";
pub const SUCCESS_PREFIX: &str = "✔️";

const VERBOSE_HINT: &str = "Run the command in verbose mode using the \"-v\" flag to see more information";

/// The single line (or block) printed when a command fails: error icon,
/// capitalized message and a hint to rerun with `--verbose`.
pub fn format_root_error(message: &str) -> String {
    let mut chars = message.chars();
    let message: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    if message.contains('\n') {
        format!("{ERROR_PREFIX} {message}\n{VERBOSE_HINT}")
    } else {
        format!("{ERROR_PREFIX} {message}. {VERBOSE_HINT}")
    }
}

/// Handles all output formatting for the application.
///
/// Human-readable output goes to stdout in the Solarized Dark palette, errors
/// go to stderr. In JSON mode only structured values are printed; status and
/// text lines are suppressed so the output can be piped.
#[derive(Clone)]
pub struct Output {
    stdout: Arc<Mutex<StandardStream>>,
    stderr: Arc<Mutex<StandardStream>>,
    pub json: bool,
    pub width: usize,
}

impl Output {
    pub fn new(color: bool, width: usize) -> Self {
        let choice = if color {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            stdout: Arc::new(Mutex::new(StandardStream::stdout(choice))),
            stderr: Arc::new(Mutex::new(StandardStream::stderr(choice))),
            json: false,
            width,
        }
    }

    /// Set JSON output mode.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Enable logging with the specified log level and return self.
    pub fn with_logging(self, level: Option<LogLevel>) -> Self {
        if let Some(log_level) = level {
            let env_filter = EnvFilter::try_new(log_level.as_str()).unwrap_or_default();
            let output_layer = OutputLayer::new(self.clone());

            // A second init (e.g. in tests) keeps the first subscriber.
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(output_layer)
                .try_init();
        }

        self
    }

    fn lock(stream: &Mutex<StandardStream>) -> MutexGuard<'_, StandardStream> {
        stream.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raw output that is not affected by output settings
    fn raw(&self, message: impl Into<String>) -> io::Result<()> {
        let message = message.into();
        let mut stdout = Self::lock(&self.stdout);
        writeln!(stdout, "{message}")
    }

    pub fn text(&self, message: impl Into<String>) -> io::Result<()> {
        if self.json {
            return Ok(());
        }
        self.raw(message)
    }

    /// Instructions the user must see even in JSON mode; written to stderr.
    pub fn notice(&self, message: impl Into<String>) -> io::Result<()> {
        let message = message.into();
        let mut stderr = Self::lock(&self.stderr);
        writeln!(stderr, "{message}")
    }

    /// Print a value as pretty JSON regardless of mode.
    pub fn json_value<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.raw(json)?;
        Ok(())
    }

    /// Print `label: value` with the label padded to `label_width`.
    pub fn kv(&self, label: &str, value: impl AsRef<str>, label_width: usize) -> io::Result<()> {
        self.text(format!(
            "{:<label_width$}  {}",
            format!("{label}:"),
            value.as_ref()
        ))
    }

    pub fn heading(&self, message: impl Into<String>) -> io::Result<()> {
        if self.json {
            return Ok(());
        }

        let message = message.into();
        let mut stdout = Self::lock(&self.stdout);

        let message_with_spaces = format!(" {message} ");
        let padding = self.width.saturating_sub(message_with_spaces.len());
        let left_pad = padding / 2;
        let right_pad = padding - left_pad;

        let header = format!(
            "{}{}{}",
            " ".repeat(left_pad),
            message_with_spaces,
            " ".repeat(right_pad)
        );

        stdout.set_color(
            ColorSpec::new()
                .set_fg(Some(SOLARIZED_BASE1))
                .set_bg(Some(SOLARIZED_BASE02))
                .set_bold(true),
        )?;
        write!(stdout, "{header}")?;
        stdout.reset()?;
        writeln!(stdout)?;
        stdout.flush()
    }

    pub fn warn(&self, message: impl Into<String>) -> io::Result<()> {
        self.status(message, "[WARNING]", SOLARIZED_YELLOW, false)
    }

    pub fn success(&self, message: impl Into<String>) -> io::Result<()> {
        self.status(message, SUCCESS_PREFIX, SOLARIZED_GREEN, false)
    }

    /// Errors always reach stderr, JSON mode included.
    pub fn error(&self, message: impl Into<String>) -> io::Result<()> {
        let message = message.into();
        let mut stderr = Self::lock(&self.stderr);

        stderr.set_color(ColorSpec::new().set_fg(Some(SOLARIZED_RED)).set_bold(true))?;
        writeln!(stderr, "{message}")?;
        stderr.reset()?;
        stderr.flush()
    }

    fn status(
        &self,
        message: impl Into<String>,
        prefix: &str,
        color: Color,
        bold: bool,
    ) -> io::Result<()> {
        if self.json {
            return Ok(());
        }

        let message = message.into();
        let mut stdout = Self::lock(&self.stdout);

        let mut color_spec = ColorSpec::new();
        color_spec.set_fg(Some(color));
        if bold {
            color_spec.set_bold(true);
        }

        stdout.set_color(&color_spec)?;
        writeln!(stdout, "{prefix} {message}")?;
        stdout.reset()?;
        stdout.flush()
    }

    /// Log lines are written to stderr so they never mix with JSON output.
    pub fn trace(&self, message: impl Into<String>, level: Level) -> io::Result<()> {
        let message = message.into();
        let mut stderr = Self::lock(&self.stderr);

        let mut color_spec = ColorSpec::new();
        match level {
            Level::ERROR => {
                color_spec.set_fg(Some(SOLARIZED_RED)).set_bold(true);
            }
            Level::WARN => {
                color_spec.set_fg(Some(SOLARIZED_YELLOW));
            }
            Level::INFO => {
                color_spec.set_fg(Some(SOLARIZED_BASE0));
            }
            Level::DEBUG => {
                color_spec.set_fg(Some(SOLARIZED_MAGENTA));
            }
            Level::TRACE => {
                color_spec.set_fg(Some(SOLARIZED_BASE01));
            }
        };

        stderr.set_color(&color_spec)?;
        writeln!(stderr, "{}: {message}", level.as_str().to_lowercase())?;
        stderr.reset()?;
        stderr.flush()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new(false, 80)
    }
}

/// A tracing subscriber layer that forwards log events to an [`Output`].
///
/// Structured fields are appended as `key=value` after the message, so
/// `tracing::debug!(port, "listener bound")` renders as
/// `debug: listener bound port=4242`.
pub struct OutputLayer {
    output: Output,
}

impl OutputLayer {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

impl<S> Layer<S> for OutputLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = event.metadata().level();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let _ = self.output.trace(visitor.render(), *level);
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn render(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }
}
