/*!
 * CLI Style System
 *
 * Styling helpers for the upload report: themed text, phase summaries and
 * the per-part checksum table.
 */

use crate::error::UploadError;
use crate::protocol::s3::{PartManifest, PhaseLedger, UploadPhase, UploadReport};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

// ============================================================================
// THEME COLORS
// ============================================================================

/// Brand colors for consistent styling
pub struct Theme;

impl Theme {
    /// Primary accent color (cyan/blue)
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    /// Success color (green)
    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    /// Warning color (yellow)
    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    /// Error color (red)
    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    /// Header style (bold cyan)
    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }

    /// Value/number highlight (bold white)
    pub fn value<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).white().bold()
    }
}

// ============================================================================
// ICONS
// ============================================================================

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";
    pub const ARROW_RIGHT: &'static str = "→";
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Draw a `=== title ===` banner
pub fn section_header(title: &str) {
    println!("\n{}", Theme::header(format!("=== {} ===", title)));
}

/// Print every recorded phase, one line each
pub fn print_phase_summary(ledger: &PhaseLedger) {
    section_header("Upload Phase Summary");
    for phase in ledger.phases() {
        println!("{}", styled_phase(phase));
    }
}

/// Print the ledger of a failed upload, or the bare error when no phase ran
pub fn print_upload_failure(error: &UploadError) {
    match error.ledger() {
        Some(ledger) => print_phase_summary(ledger),
        None => {
            section_header("Upload Failure Summary");
            for line in failure_summary_lines(error) {
                println!("{}", Theme::error(line));
            }
        }
    }
}

/// Summary lines for a failed upload
pub fn failure_summary_lines(error: &UploadError) -> Vec<String> {
    match error.ledger() {
        Some(ledger) => ledger.summary_lines(),
        None => vec![format!("{} {}", Icons::ERROR, error)],
    }
}

fn styled_phase(phase: &UploadPhase) -> String {
    if phase.success {
        Theme::success(phase.summary()).to_string()
    } else {
        Theme::error(phase.summary()).to_string()
    }
}

/// Print the checksum table and final CRC32 of a verified upload
pub fn print_upload_report(report: &UploadReport) {
    section_header("Checksum Summary");
    println!("{}", checksum_table(&report.manifest));
    println!(
        "{} {}",
        Theme::primary("Final object CRC32:"),
        Theme::value(&report.final_checksum)
    );
    println!(
        "{}",
        stats_table(&[
            ("Parts", report.manifest.len().to_string()),
            ("Bytes sent", format_bytes(report.session.bytes_sent)),
            ("Upload ID", report.session.upload_id.clone()),
        ])
    );
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a styled data table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a minimal table (no outer borders)
pub fn create_minimal_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a key-value table for stats
pub fn stats_table(items: &[(&str, String)]) -> Table {
    let mut table = create_minimal_table();

    for (key, value) in items {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(value)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
        ]);
    }

    table
}

/// One row per part: number, size and CRC32
pub fn checksum_table(manifest: &PartManifest) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        header_cell("Part"),
        header_cell("Size"),
        header_cell("CRC32"),
    ]);

    for part in manifest.parts() {
        table.add_row(vec![
            Cell::new(part.part_number),
            Cell::new(format_bytes(part.size as u64)),
            Cell::new(&part.checksum_crc32).fg(Color::DarkGrey),
        ]);
    }

    table
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let base = 1024.0_f64;
    let exp = (bytes_f.ln() / base.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f / base.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.2} {}", value, UNITS[exp])
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

/// Print a styled warning message
pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING),
        Theme::warning(message)
    );
}

/// Print a styled success message
pub fn print_success(message: &str) {
    println!(
        "{} {}",
        Theme::success(Icons::SUCCESS),
        Theme::success(message)
    );
}

/// Print a styled info message
pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO), message);
}

// ============================================================================
// TESTS
// ============================================================================
