//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use bytesize::ByteSize;
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Dim a placeholder for values the router did not report.
pub fn unavailable(color: bool) -> String {
    if color {
        "unavailable".dimmed().to_string()
    } else {
        "unavailable".to_owned()
    }
}

/// Highlight a label.
pub fn label(text: &str, color: bool) -> String {
    if color {
        text.cyan().bold().to_string()
    } else {
        text.to_owned()
    }
}

/// Human-readable transfer rate, e.g. `1.2 MiB/s`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn format_rate(bytes_per_sec: f64) -> String {
    let bytes = ByteSize::b(bytes_per_sec.max(0.0).round() as u64);
    format!("{}/s", bytes.to_string_as(true))
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the data via serde
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => Ok(data.iter().map(&line_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item detail views
/// don't use the `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use tabled::Tabled;

    use super::{format_rate, render_list, render_single};
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    struct Item {
        name: &'static str,
        value: u32,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Name")]
        name: String,
    }

    fn items() -> Vec<Item> {
        vec![Item { name: "wan", value: 1 }, Item { name: "lan", value: 2 }]
    }

    #[test]
    fn plain_list_is_one_line_per_item() {
        let out = render_list(
            OutputFormat::Plain,
            &items(),
            |i| Row { name: i.name.into() },
            |i| format!("{} {}", i.name, i.value),
        )
        .expect("rendered");
        assert_eq!(out, "wan 1\nlan 2");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_single(
            OutputFormat::JsonCompact,
            &Item { name: "wan", value: 7 },
            |_| String::new(),
            |_| String::new(),
        )
        .expect("rendered");
        assert_eq!(out, r#"{"name":"wan","value":7}"#);
    }

    #[test]
    fn table_has_header() {
        let out = render_list(
            OutputFormat::Table,
            &items(),
            |i| Row { name: i.name.into() },
            |i| i.name.to_owned(),
        )
        .expect("rendered");
        assert!(out.contains("Name"));
        assert!(out.contains("lan"));
    }

    #[test]
    fn rates_are_human_readable() {
        assert_eq!(format_rate(0.0), "0 B/s");
        assert_eq!(format_rate(-4.0), "0 B/s");
        assert_eq!(format_rate(1024.0), "1.0 KiB/s");
    }
}
