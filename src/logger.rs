//! Terminal output for marklive.
//!
//! Two channels share stdout:
//! - module lines from `log!` / `debug!`, e.g. `[watch] notes.md -> notes.html`
//! - the status block of `marklive watch`, redrawn in place after every
//!   committed render so only the latest outcome stays visible
//!
//! ```ignore
//! log!("watch"; "watching {}", path.display());
//! debug!("editor"; "generation {} committed", generation);
//! status_success("rendered: notes.md");
//! ```

use std::io::{Write, stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crossterm::cursor::MoveUp;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use owo_colors::{OwoColorize, Style};
use parking_lot::Mutex;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// The one status block of the process.
static STATUS: Mutex<StatusBlock> = Mutex::new(StatusBlock::new());

/// Enable or disable `debug!` output (`--verbose`).
pub fn set_verbose(on: bool) {
    VERBOSE.store(on, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print a line tagged with a coloured `[module]` prefix.
///
/// ```ignore
/// log!("render"; "{} -> {}", input, output);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {
        $crate::logger::log($module, &format!($($arg)*))
    };
}

/// Like `log!`, but silent unless `--verbose` was given.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    };
}

pub fn log(module: &str, message: &str) {
    let line = format!("{} {message}", format!("[{module}]").style(module_style(module)));
    let mut out = stdout().lock();
    // the status block may have left a partial line behind
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{line}").ok();
    out.flush().ok();
}

fn module_style(module: &str) -> Style {
    let style = Style::new().bold();
    match module.to_ascii_lowercase().as_str() {
        "watch" => style.bright_green(),
        "render" => style.bright_blue(),
        "editor" => style.bright_magenta(),
        "error" => style.bright_red(),
        _ => style.bright_yellow(),
    }
}

// ============================================================================
// Watch status block
// ============================================================================

/// Outcome shown by the status block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
    Pending,
}

impl StatusKind {
    fn marker(self) -> Option<String> {
        match self {
            Self::Success => Some("✓".green().to_string()),
            Self::Error => Some("✗".red().to_string()),
            Self::Pending => None,
        }
    }
}

/// Block of status lines that is erased before the next one is drawn.
#[derive(Debug)]
pub struct StatusBlock {
    /// Lines drawn by the previous `show`.
    height: u16,
}

impl StatusBlock {
    pub const fn new() -> Self {
        Self { height: 0 }
    }

    pub fn show(&mut self, kind: StatusKind, message: &str) {
        let text = compose_status(&clock_stamp(unix_secs()), kind, message);
        let mut out = stdout().lock();
        if self.height > 0 {
            execute!(out, MoveUp(self.height), Clear(ClearType::FromCursorDown)).ok();
        }
        writeln!(out, "{text}").ok();
        out.flush().ok();
        self.height = block_height(&text);
    }
}

impl Default for StatusBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// `[HH:MM:SS] <marker> message`, with the pending message dimmed.
fn compose_status(stamp: &str, kind: StatusKind, message: &str) -> String {
    let stamp = format!("[{stamp}]").dimmed().to_string();
    match kind.marker() {
        Some(marker) => format!("{stamp} {marker} {message}"),
        None => format!("{stamp} {}", message.dimmed()),
    }
}

fn block_height(text: &str) -> u16 {
    u16::try_from(text.lines().count().max(1)).unwrap_or(u16::MAX)
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// UTC wall-clock time of day for `secs` since the epoch.
fn clock_stamp(secs: u64) -> String {
    let day = secs % 86_400;
    format!("{:02}:{:02}:{:02}", day / 3600, day % 3600 / 60, day % 60)
}

pub fn status_success(message: &str) {
    STATUS.lock().show(StatusKind::Success, message);
}

/// Show a failure, with `detail` on its own line when present.
pub fn status_error(summary: &str, detail: &str) {
    let message = match detail {
        "" => summary.to_string(),
        detail => format!("{summary}\n{detail}"),
    };
    STATUS.lock().show(StatusKind::Error, &message);
}

pub fn status_pending(message: &str) {
    STATUS.lock().show(StatusKind::Pending, message);
}
