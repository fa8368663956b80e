use std::fmt::Write;
use std::io::{self, IsTerminal};

use console::Style;
use serde::Serialize;
use terrace_domain::{NodeId, OrderReport, ValidationReport, WalkSummary};

mod error;
mod options;

pub use error::ReportError;
pub use options::{ColorChoice, OutputFormat, RenderOptions};

/// Render a validation report in the requested output format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_validation(
    report: &ValidationReport,
    format: OutputFormat,
    options: &RenderOptions,
) -> std::result::Result<String, ReportError> {
    match format {
        OutputFormat::Json => to_json("validation", report),
        OutputFormat::Text => Ok(render_validation_text(report, options)),
    }
}

/// Render an execution order in the requested output format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_order(
    report: &OrderReport,
    format: OutputFormat,
    options: &RenderOptions,
) -> std::result::Result<String, ReportError> {
    match format {
        OutputFormat::Json => to_json("order", report),
        OutputFormat::Text => Ok(render_order_text(report, options)),
    }
}

/// Render the outcome of a walk in the requested output format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_walk(
    summary: &WalkSummary,
    format: OutputFormat,
    options: &RenderOptions,
) -> std::result::Result<String, ReportError> {
    match format {
        OutputFormat::Json => to_json("walk", summary),
        OutputFormat::Text => Ok(render_walk_text(summary, options)),
    }
}

fn to_json<T: Serialize>(report: &'static str, value: &T) -> std::result::Result<String, ReportError> {
    serde_json::to_string_pretty(value).map_err(|source| ReportError::JsonSerialize { report, source })
}

// ---------------------------------------------------------------------------
// Validation text
// ---------------------------------------------------------------------------

fn render_validation_text(report: &ValidationReport, options: &RenderOptions) -> String {
    let mut output = String::new();
    let style = TextStyle::new(options.color);

    append_header(&mut output, "validate", options, &style);
    append_warnings_and_errors(&mut output, &report.warnings, &report.errors, &style);

    let verdict = if report.valid {
        style.ok_label("valid")
    } else {
        style.error_label("invalid")
    };
    let mut parts = vec![verdict];
    if !report.errors.is_empty() {
        parts.push(style.error_label(&plural(report.errors.len(), "error", "errors")));
    }
    if !report.warnings.is_empty() {
        parts.push(style.warn_label(&plural(report.warnings.len(), "warning", "warnings")));
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{} {}",
        style.tally_label("Validation:"),
        parts.join(", ")
    );
    output
}

// ---------------------------------------------------------------------------
// Order text
// ---------------------------------------------------------------------------

fn render_order_text(report: &OrderReport, options: &RenderOptions) -> String {
    let mut output = String::new();
    let style = TextStyle::new(options.color);

    append_header(&mut output, "order", options, &style);

    if options.verbose && !report.documents.is_empty() {
        let _ = writeln!(output);
        for document in &report.documents {
            let _ = writeln!(
                output,
                "  {}",
                style.dim(&format!("document {}", document.display()))
            );
        }
    }

    let _ = writeln!(output);
    if report.order.is_empty() {
        let _ = writeln!(output, "  Nothing to do.");
    } else {
        let width = report.order.len().to_string().len();
        for (index, id) in report.order.iter().enumerate() {
            let step = format!("{:>width$}", index + 1);
            let _ = writeln!(output, "  {}  {}", style.dim(&step), style.primary_text(id));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{} {}, {}",
        style.tally_label("Order:"),
        plural(report.stats.nodes, "node", "nodes"),
        plural(report.stats.edges, "edge", "edges")
    );
    output
}

// ---------------------------------------------------------------------------
// Walk text
// ---------------------------------------------------------------------------

fn render_walk_text(summary: &WalkSummary, options: &RenderOptions) -> String {
    let mut output = String::new();
    let style = TextStyle::new(options.color);

    append_header(&mut output, "walk", options, &style);
    let _ = writeln!(output);

    let total = summary.visited.len() + summary.failed.len() + summary.skipped.len();
    if total == 0 {
        let _ = writeln!(output, "  Nothing to do.");
        let _ = writeln!(output);
        let _ = writeln!(output, "{} nothing to do", style.tally_label("Walk:"));
        return output;
    }

    append_walk_lines(&mut output, &summary.visited, WalkOutcome::Visited, &style);
    append_walk_lines(&mut output, &summary.failed, WalkOutcome::Failed, &style);
    append_walk_lines(&mut output, &summary.skipped, WalkOutcome::Skipped, &style);

    let mut parts = Vec::new();
    if !summary.visited.is_empty() {
        parts.push(style.ok_label(&format!("{} visited", summary.visited.len())));
    }
    if !summary.failed.is_empty() {
        parts.push(style.error_label(&format!("{} failed", summary.failed.len())));
    }
    if !summary.skipped.is_empty() {
        parts.push(style.dim(&format!("{} skipped", summary.skipped.len())));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{} {}", style.tally_label("Walk:"), parts.join(", "));
    output
}

#[derive(Debug, Clone, Copy)]
enum WalkOutcome {
    Visited,
    Failed,
    Skipped,
}

fn append_walk_lines(output: &mut String, ids: &[NodeId], outcome: WalkOutcome, style: &TextStyle) {
    for id in ids {
        let (symbol, label) = match outcome {
            WalkOutcome::Visited => (style.ok_symbol("+"), style.ok_label("visited")),
            WalkOutcome::Failed => (style.error_symbol("!"), style.error_label("failed")),
            WalkOutcome::Skipped => (style.dim("="), style.dim("skipped")),
        };
        let _ = writeln!(
            output,
            "  {symbol} {}{}",
            TextStyle::pad_label(&label),
            style.primary_text(id)
        );
    }
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn append_header(output: &mut String, command: &str, options: &RenderOptions, style: &TextStyle) {
    let _ = write!(output, "{}", style.header_command(command));
    if let Some(target) = &options.target {
        let _ = write!(output, " {}", style.header_target(target));
    }
    if let Some(module) = options.module.as_deref().filter(|module| !module.is_empty()) {
        let _ = write!(output, " {}", style.dim(&format!("(module {module})")));
    }
    let _ = writeln!(output);
}

fn append_warnings_and_errors(
    output: &mut String,
    warnings: &[String],
    errors: &[String],
    style: &TextStyle,
) {
    if warnings.is_empty() && errors.is_empty() {
        return;
    }
    let _ = writeln!(output);
    for warning in warnings {
        let _ = writeln!(output, "  {} {warning}", style.warn_prefix("warn:"));
    }
    for error in errors {
        let _ = writeln!(output, "  {} {error}", style.error_prefix("error:"));
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

// ---------------------------------------------------------------------------
// TextStyle
// ---------------------------------------------------------------------------

const LABEL_WIDTH: usize = 10;

#[derive(Debug, Clone)]
struct TextStyle {
    color_enabled: bool,
    ok_sym_style: Style,
    error_sym_style: Style,
    ok_label_style: Style,
    warn_label_style: Style,
    error_label_style: Style,
    primary_style: Style,
    dim_style: Style,
    header_cmd_style: Style,
    header_target_style: Style,
    warn_prefix_style: Style,
    error_prefix_style: Style,
    tally_label_style: Style,
}

impl TextStyle {
    fn new(choice: ColorChoice) -> Self {
        Self {
            color_enabled: should_color(choice),
            ok_sym_style: Style::new().green().bold(),
            error_sym_style: Style::new().red().bold(),
            ok_label_style: Style::new().green(),
            warn_label_style: Style::new().yellow(),
            error_label_style: Style::new().red(),
            primary_style: Style::new().white(),
            dim_style: Style::new().dim(),
            header_cmd_style: Style::new().white().bold(),
            header_target_style: Style::new().dim(),
            warn_prefix_style: Style::new().yellow().bold(),
            error_prefix_style: Style::new().red().bold(),
            tally_label_style: Style::new().white().bold(),
        }
    }

    fn paint<T: std::fmt::Display>(&self, style: &Style, text: T) -> String {
        if self.color_enabled {
            style.clone().force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn pad_label(painted: &str) -> String {
        let visible_len = console::measure_text_width(painted);
        if visible_len < LABEL_WIDTH {
            format!("{painted}{}", " ".repeat(LABEL_WIDTH - visible_len))
        } else {
            format!("{painted} ")
        }
    }

    fn ok_symbol(&self, s: &str) -> String {
        self.paint(&self.ok_sym_style, s)
    }
    fn error_symbol(&self, s: &str) -> String {
        self.paint(&self.error_sym_style, s)
    }

    fn ok_label(&self, s: &str) -> String {
        self.paint(&self.ok_label_style, s)
    }
    fn warn_label(&self, s: &str) -> String {
        self.paint(&self.warn_label_style, s)
    }
    fn error_label(&self, s: &str) -> String {
        self.paint(&self.error_label_style, s)
    }

    fn primary_text(&self, s: &str) -> String {
        self.paint(&self.primary_style, s)
    }
    fn dim(&self, s: &str) -> String {
        self.paint(&self.dim_style, s)
    }

    fn header_command(&self, s: &str) -> String {
        self.paint(&self.header_cmd_style, s)
    }
    fn header_target(&self, s: &str) -> String {
        self.paint(&self.header_target_style, s)
    }

    fn warn_prefix(&self, s: &str) -> String {
        self.paint(&self.warn_prefix_style, s)
    }
    fn error_prefix(&self, s: &str) -> String {
        self.paint(&self.error_prefix_style, s)
    }

    fn tally_label(&self, s: &str) -> String {
        self.paint(&self.tally_label_style, s)
    }
}

fn should_color(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stdout().is_terminal(),
    }
}
