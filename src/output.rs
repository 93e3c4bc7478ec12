//! CLI output formatting.
//!
//! Each result type has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## info
//!
//! ```text
//! dawn.jpg
//!     Geometry: 1449x1932
//!     Format: JPEG (image/jpeg)
//!     Quality: 90
//!     Size: 312.4 KiB
//!     Properties:
//!         iptc:title: Dawn
//! ```
//!
//! ## Operations
//!
//! ```text
//! Wrote out1.png
//! Wrote out2.png
//! ```
//!
//! ## list / search
//!
//! ```text
//!  * crop           crop a region e.g. ...
//!  * crop-viewport  crop a full-width band ...
//! ```

use crate::commands::CommandHelp;
use crate::session::{ImageInfo, Outcome};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

pub fn format_info(info: &ImageInfo) -> Vec<String> {
    let mut lines = vec![info.file_name.clone().unwrap_or_else(|| "(input)".to_string())];
    lines.push(format!("{}Geometry: {}", indent(1), info.geometry));
    lines.push(format!("{}Format: {} ({})", indent(1), info.format, info.mime_type));
    if let Some(q) = info.quality {
        lines.push(format!("{}Quality: {q}", indent(1)));
    }
    lines.push(format!("{}Size: {}", indent(1), format_size(info.file_size)));
    if !info.properties.is_empty() {
        lines.push(format!("{}Properties:", indent(1)));
        for (key, value) in &info.properties {
            lines.push(format!("{}{key}: {value}", indent(2)));
        }
    }
    lines
}

pub fn print_info(info: &ImageInfo) {
    for line in format_info(info) {
        println!("{line}");
    }
}

/// Summary of an operation's outcome.
///
/// In-memory results are summarized only; the CLI writes their bytes itself.
pub fn format_outcome(outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Written(locations) => locations.iter().map(|loc| format!("Wrote {loc}")).collect(),
        Outcome::Encoded(images) => images
            .iter()
            .map(|img| format!("Encoded {:?} ({})", img.format, format_size(img.bytes.len() as u64)))
            .collect(),
        Outcome::Skipped => vec!["Nothing to do".to_string()],
    }
}

pub fn print_outcome(outcome: &Outcome) {
    for line in format_outcome(outcome) {
        println!("{line}");
    }
}

pub fn format_commands(commands: &[CommandHelp]) -> Vec<String> {
    let width = commands.iter().map(|c| c.name.len()).max().unwrap_or(0);
    commands
        .iter()
        .map(|c| format!(" * {:<width$}  {}", c.name, c.description))
        .collect()
}

pub fn print_commands(commands: &[CommandHelp]) {
    for line in format_commands(commands) {
        println!("{line}");
    }
}

pub fn format_viewport(percent: u8) -> Vec<String> {
    vec![format!("Best viewport: {percent}%")]
}

pub fn print_viewport(percent: u8) {
    for line in format_viewport(percent) {
        println!("{line}");
    }
}

pub fn format_command_line(argv: &[String]) -> Vec<String> {
    vec![format!("Using -> {}", argv.join(" "))]
}

pub fn print_command_line(argv: &[String]) {
    for line in format_command_line(argv) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::session::EncodedImage;
    use image::ImageFormat;
    use std::collections::BTreeMap;

    fn info() -> ImageInfo {
        ImageInfo {
            geometry: "640x480".into(),
            mime_type: "image/jpeg".into(),
            format: "JPEG".into(),
            quality: Some(85),
            file_size: 2048,
            file_name: Some("dawn.jpg".into()),
            properties: BTreeMap::from([("iptc:title".to_string(), "Dawn".to_string())]),
        }
    }

    // =========================================================================
    // Sizes
    // =========================================================================

    #[test]
    fn format_size_bytes() {
        assert_eq!(format_size(512), "512 B");
    }

    #[test]
    fn format_size_kib_and_mib() {
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    // =========================================================================
    // info
    // =========================================================================

    #[test]
    fn format_info_full() {
        assert_eq!(
            format_info(&info()),
            vec![
                "dawn.jpg",
                "    Geometry: 640x480",
                "    Format: JPEG (image/jpeg)",
                "    Quality: 85",
                "    Size: 2.0 KiB",
                "    Properties:",
                "        iptc:title: Dawn",
            ]
        );
    }

    #[test]
    fn format_info_omits_missing_parts() {
        let mut info = info();
        info.quality = None;
        info.file_name = None;
        info.properties.clear();
        let lines = format_info(&info);
        assert_eq!(lines[0], "(input)");
        assert!(!lines.iter().any(|l| l.contains("Quality") || l.contains("Properties")));
    }

    // =========================================================================
    // Outcomes
    // =========================================================================

    #[test]
    fn format_written_outcome() {
        let outcome = Outcome::Written(vec![Location::parse("out1.png"), Location::parse("out2.png")]);
        assert_eq!(format_outcome(&outcome), vec!["Wrote out1.png", "Wrote out2.png"]);
    }

    #[test]
    fn format_encoded_outcome() {
        let outcome = Outcome::Encoded(vec![EncodedImage {
            bytes: vec![0; 10],
            format: ImageFormat::Png,
        }]);
        assert_eq!(format_outcome(&outcome), vec!["Encoded Png (10 B)"]);
    }

    #[test]
    fn format_skipped_outcome() {
        assert_eq!(format_outcome(&Outcome::Skipped), vec!["Nothing to do"]);
    }

    // =========================================================================
    // Commands
    // =========================================================================

    #[test]
    fn format_commands_aligns_descriptions() {
        let commands = [
            CommandHelp { name: "crop", description: "crop it" },
            CommandHelp { name: "crop-viewport", description: "band" },
        ];
        assert_eq!(
            format_commands(&commands),
            vec![" * crop           crop it", " * crop-viewport  band"]
        );
    }

    #[test]
    fn format_commands_empty() {
        assert!(format_commands(&[]).is_empty());
    }

    #[test]
    fn format_viewport_line() {
        assert_eq!(format_viewport(25), vec!["Best viewport: 25%"]);
    }

    #[test]
    fn format_command_line_joins_argv() {
        assert_eq!(
            format_command_line(&["feh".into(), "/tmp/a.png".into()]),
            vec!["Using -> feh /tmp/a.png"]
        );
    }
}
