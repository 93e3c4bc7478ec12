//! Built-in help: the session operations and a one-line usage for each.
//!
//! `search` matches a regular expression against the whole
//! `name # description` line, so both names and descriptions are searchable.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHelp {
    pub name: &'static str,
    pub description: &'static str,
}

impl CommandHelp {
    /// The `name # description` form searches run against.
    pub fn line(&self) -> String {
        format!("{} # {}", self.name, self.description)
    }
}

const fn help(name: &'static str, description: &'static str) -> CommandHelp {
    CommandHelp { name, description }
}

/// Every operation, sorted by name.
pub static COMMANDS: &[CommandHelp] = &[
    help("add-text", "annotate text along the bottom edge e.g. add-text 'some text'"),
    help("animate", "assemble the input frames into an animated GIF e.g. animate --delay 100"),
    help("best-viewport", "vertical offset (percent) that best frames the image"),
    help("blur", "blur a region e.g. blur --x 231 --y 123 --width 85 --height 85"),
    help("capture-screen", "grab the screen or the focused window e.g. capture-screen --window"),
    help("composite", "draw another image on top e.g. composite logo.png --x 10 --y 10"),
    help("convert", "re-encode in another format e.g. convert webp"),
    help("crop", "crop a region e.g. crop --x 231 --y 123 --width 85 --height 85"),
    help("crop-viewport", "crop a full-width band around the best viewport e.g. crop-viewport 200"),
    help("equalize", "histogram-equalize each colour channel"),
    help("flip", "mirror top to bottom"),
    help("flop", "mirror left to right"),
    help("grayscale", "convert to grayscale"),
    help("info", "geometry, format, quality, size and properties of the image"),
    help("quantize", "reduce to a palette of N colours e.g. quantize 16"),
    help("rectangle", "draw a rectangle outline e.g. rectangle --x 5 --y 5 --width 40 --height 20"),
    help("resize", "resize to a maximum geometry e.g. resize 320x240 (or *320x240 to lock the width)"),
    help("rotate", "rotate clockwise by degrees e.g. rotate 90"),
    help("scale", "scale by a factor e.g. scale 0.5"),
    help("screencast", "record numbered frames to the output pattern e.g. screencast --seconds 5"),
    help("sketch", "pencil-sketch effect"),
    help("threshold", "black and white split at a luma level e.g. threshold 128"),
    help("thumbnail", "shrink to fit within a geometry e.g. thumbnail 160x120"),
    help("view", "show the output in the external viewer"),
    help("vignette", "darken towards the corners e.g. vignette --strength 0.8"),
];

/// All commands.
pub fn list() -> &'static [CommandHelp] {
    COMMANDS
}

/// Commands whose help line matches `pattern`.
pub fn search(pattern: &str) -> Result<Vec<CommandHelp>, regex::Error> {
    let re = Regex::new(pattern)?;
    Ok(COMMANDS
        .iter()
        .filter(|cmd| re.is_match(&cmd.line()))
        .copied()
        .collect())
}
