//! DMXP CLI UI primitives.
//!
//! Everything here writes to stderr: in plugin mode stdout carries the
//! response envelope.

use std::path::Path;

use console::style;
use dmxp_compiler::diagnostic::SourceLocation;
use dmxp_compiler::{Diagnostic, GeneratedFile, Severity};

/// Terminal palette
pub mod colors {
    use console::Color;

    pub const CYAN: Color = Color::Color256(51);
    pub const MAGENTA: Color = Color::Color256(201);
    pub const AMBER: Color = Color::Color256(214);
    pub const NEON_GREEN: Color = Color::Color256(82);
    pub const DIM: Color = Color::Color256(240);
}

pub mod symbols {
    pub const DIAMOND: &str = "\u{25C6}"; // ◆
    pub const DIAMOND_OUTLINE: &str = "\u{25C7}"; // ◇
    pub const TARGET_FILLED: &str = "\u{25C9}"; // ◉
    pub const TRIANGLE: &str = "\u{25B8}"; // ▸
    pub const DOT: &str = "\u{00B7}"; // ·
}

/// `file:line:col`, as an OSC 8 hyperlink when the position is known.
pub fn location_link(location: &SourceLocation) -> String {
    let display = location.to_string();
    if location.line.is_none() || !console::colors_enabled_stderr() {
        return display;
    }
    let abs_path = std::fs::canonicalize(&location.file)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| location.file.clone());
    let uri = format!("file://{}#{}", abs_path, location.line.unwrap_or(1));
    format!("\x1b]8;;{}\x07{}\x1b]8;;\x07", uri, display)
}

/// One diagnostic, styled by severity, with related locations indented below.
pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    let (symbol, color) = match diagnostic.severity {
        Severity::Error => (symbols::DIAMOND, colors::MAGENTA),
        Severity::Warning => (symbols::DIAMOND_OUTLINE, colors::AMBER),
    };
    let mut out = format!(
        "  {} {} {}",
        style(symbol).fg(color),
        style(format!("{}[{}]", diagnostic.severity, diagnostic.code)).fg(color).bold(),
        diagnostic.message
    );
    if let Some(location) = &diagnostic.location {
        out.push_str(&format!("\n      {} {}", style(symbols::TRIANGLE).fg(colors::DIM), location_link(location)));
    }
    for related in &diagnostic.related {
        out.push_str(&format!(
            "\n      {} {} {}",
            style(symbols::DOT).fg(colors::DIM),
            style("see").dim(),
            location_link(related)
        ));
    }
    out
}

/// Prints diagnostics; errors are skipped when the host reports them itself.
pub fn diagnostics(diagnostics: &[Diagnostic], include_errors: bool) {
    for diagnostic in diagnostics {
        if diagnostic.is_error() && !include_errors {
            continue;
        }
        eprintln!("{}", format_diagnostic(diagnostic));
    }
}

pub fn success(msg: &str) {
    eprintln!("  {} {}", style(symbols::TARGET_FILLED).fg(colors::NEON_GREEN), msg);
}

pub fn error(msg: &str) {
    eprintln!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::MAGENTA),
        style(msg).fg(colors::MAGENTA)
    );
}

pub fn box_header(title: &str) {
    let width = 55;
    let title_padded = format!(" {} ", title);
    let dashes = width - title_padded.chars().count().min(width - 4) - 4;

    eprintln!(
        "  {}{}{}{}",
        style("\u{256D}\u{2500}").fg(colors::CYAN), // ╭─
        style(title_padded).fg(colors::CYAN).bold(),
        style("\u{2500}".repeat(dashes)).fg(colors::CYAN),
        style("\u{256E}").fg(colors::CYAN) // ╮
    );
}

pub fn box_line(content: &str) {
    let width: usize = 53;
    let padding = width.saturating_sub(content.chars().count());
    eprintln!(
        "  {} {}{}{}",
        style("\u{2502}").fg(colors::CYAN), // │
        content,
        " ".repeat(padding),
        style("\u{2502}").fg(colors::CYAN)
    );
}

pub fn box_footer() {
    let width = 55;
    eprintln!(
        "  {}{}{}",
        style("\u{2570}").fg(colors::CYAN), // ╰
        style("\u{2500}".repeat(width - 2)).fg(colors::CYAN),
        style("\u{256F}").fg(colors::CYAN) // ╯
    );
}

pub fn tree_item(name: &str, description: &str, is_last: bool) {
    let connector = if is_last {
        "\u{2570}\u{2500}\u{2500}" // ╰──
    } else {
        "\u{251C}\u{2500}\u{2500}" // ├──
    };
    eprintln!(
        "    {}  {}   {}",
        style(connector).fg(colors::DIM),
        style(name).fg(colors::CYAN),
        style(description).dim()
    );
}

/// Per-target file counts, then the file tree under `out`.
pub fn summary(out: &Path, files: &[GeneratedFile]) {
    let mut targets: Vec<(&str, usize)> = Vec::new();
    for file in files {
        match targets.iter_mut().find(|(t, _)| *t == file.target) {
            Some((_, count)) => *count += 1,
            None => targets.push((&file.target, 1)),
        }
    }

    box_header("TARGETS");
    for (target, count) in &targets {
        box_line(&format!(
            "{} {:12} {} file{}",
            symbols::TRIANGLE,
            target,
            count,
            if *count == 1 { "" } else { "s" }
        ));
    }
    box_footer();
    eprintln!();

    eprintln!("  {} {}/", style(symbols::TRIANGLE).fg(colors::CYAN), style(out.display()).fg(colors::CYAN).bold());
    for (i, file) in files.iter().enumerate() {
        tree_item(&file.path, &file.target, i + 1 == files.len());
    }
    eprintln!();
}

pub fn timing(label: &str, duration_ms: u128) {
    eprintln!(
        "  {} {} in {}ms",
        style(symbols::DIAMOND_OUTLINE).fg(colors::CYAN),
        label,
        duration_ms
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_diagnostic_lists_locations() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
        let diagnostic = Diagnostic::error("dmxp::options::duplicate_channel", "channel 'x' is already declared")
            .at(SourceLocation::new("b.proto", "b.Two").with_position(9, 5))
            .related_to(SourceLocation::new("a.proto", "a.One"));

        let text = format_diagnostic(&diagnostic);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("error[dmxp::options::duplicate_channel]"));
        assert!(lines[1].ends_with("b.proto:9:5"));
        assert!(lines[2].ends_with("see a.proto (a.One)"));
    }

    #[test]
    fn test_location_without_position_is_plain() {
        let location = SourceLocation::new("shop.proto", "shop.Order");
        assert_eq!(location_link(&location), "shop.proto (shop.Order)");
    }
}
