//! Run summary output: styled text on stderr or JSON on stdout.

use layer_catalog::RunSummary;
use std::io::IsTerminal;
use std::time::Duration;

/// Check if color output is enabled.
pub fn color_enabled() -> bool {
    // Respect NO_COLOR env (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stderr().is_terminal()
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Colored string builder.
pub struct Styled {
    use_color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self {
            use_color: color_enabled(),
        }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    /// Green checkmark symbol.
    pub fn ok_sym(&self) -> &str {
        if self.use_color {
            "\x1b[32m\u{2713}\x1b[0m"
        } else {
            "OK"
        }
    }

    /// Red X symbol.
    pub fn fail_sym(&self) -> &str {
        if self.use_color {
            "\x1b[31m\u{2717}\x1b[0m"
        } else {
            "!!"
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.paint(GREEN, s)
    }

    pub fn red(&self, s: &str) -> String {
        self.paint(RED, s)
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint(DIM, s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.paint(BOLD, s)
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }
}

/// Lines describing a finished run.
pub fn summary_lines(s: &Styled, summary: &RunSummary, elapsed: Duration) -> Vec<String> {
    vec![
        format!(
            "  {} {} in {:.1}s",
            s.ok_sym(),
            s.green("Export complete"),
            elapsed.as_secs_f64()
        ),
        format!("  Layers:    {}", summary.layers),
        format!("  Services:  {}", summary.services),
        format!(
            "  Lookups:   {} {}",
            summary.lookups,
            s.dim("(metadata requests)")
        ),
        format!("  Output:    {}", s.bold(&summary.output.display().to_string())),
    ]
}

/// Print a finished run in branded format.
pub fn print_summary(s: &Styled, summary: &RunSummary, elapsed: Duration) {
    eprintln!();
    for line in summary_lines(s, summary, elapsed) {
        eprintln!("{line}");
    }
}

/// The serialized summary plus run status and duration.
pub fn summary_json(summary: &RunSummary, elapsed: Duration) -> serde_json::Result<serde_json::Value> {
    let mut value = serde_json::to_value(summary)?;
    if let serde_json::Value::Object(fields) = &mut value {
        fields.insert("status".to_string(), "ok".into());
        fields.insert("duration_ms".to_string(), (elapsed.as_millis() as u64).into());
    }
    Ok(value)
}

pub fn failure_json(error: &anyhow::Error) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "error": format!("{error:#}"),
    })
}

/// Print a failed run.
pub fn print_failure(s: &Styled, error: &anyhow::Error) {
    eprintln!("  {} {}", s.fail_sym(), s.red(&format!("{error:#}")));
}

/// Print JSON output to stdout.
pub fn print_json(value: &serde_json::Value) {
    if let Ok(s) = serde_json::to_string_pretty(value) {
        println!("{s}");
    }
}
