use clap::{Parser, Subcommand};
use easyimg::config;
use easyimg::external::{CaptureMode, CaptureRequest};
use easyimg::imaging::{Color, Region};
use easyimg::location::Location;
use easyimg::session::{ImageSession, Input, Outcome, Output};
use easyimg::{commands, output};
use std::error::Error;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lossy encoding quality for commands that write an image.
#[derive(clap::Args, Clone, Copy)]
struct QualityArg {
    /// JPEG quality 1-100 (defaults to [images] quality, then 90)
    #[arg(long, short, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,
}

/// A rectangle in pixels, origin top-left.
#[derive(clap::Args, Clone, Copy)]
struct RegionArgs {
    #[arg(long, default_value_t = 0)]
    x: u32,
    #[arg(long, default_value_t = 0)]
    y: u32,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
}

impl From<RegionArgs> for Region {
    fn from(r: RegionArgs) -> Self {
        Region::new(r.x, r.y, r.width, r.height)
    }
}

#[derive(clap::Args, Clone, Copy)]
struct CaptureArgs {
    /// Capture the focused window instead of the whole screen
    #[arg(long)]
    window: bool,
    /// Include the mouse pointer
    #[arg(long)]
    cursor: bool,
    /// Include window decorations (with --window)
    #[arg(long)]
    borders: bool,
}

impl From<CaptureArgs> for CaptureRequest {
    fn from(c: CaptureArgs) -> Self {
        CaptureRequest {
            mode: if c.window {
                CaptureMode::Window
            } else {
                CaptureMode::Screen
            },
            include_cursor: c.cursor,
            include_borders: c.borders,
        }
    }
}

#[derive(Parser)]
#[command(name = "easyimg")]
#[command(about = "Scriptable image manipulation")]
#[command(long_about = "\
Scriptable image manipulation

Bind an input and an optional output, then run one operation:

  easyimg --input photo.jpg --output small.jpg resize 640x480
  easyimg --input photo.jpg --output banner.jpg crop-viewport 300
  easyimg --input 'shots/frame%d.png' --output anim.gif animate --delay 80
  easyimg --output 'cast/frame%03d.png' screencast --seconds 5

Inputs and outputs may be local paths, file:// or http(s) URLs, or any
scheme with a [publish.commands] template. A %d (or %03d) placeholder names
a numbered frame sequence. '--input -' reads the image from stdin. Without
--output, the encoded result is written to stdout.

Run 'easyimg list' for every operation and 'easyimg gen-config' for a
documented config.toml.")]
#[command(version)]
struct Cli {
    /// Input image, URL, or frame pattern ('-' for stdin)
    #[arg(long, short, global = true)]
    input: Option<String>,

    /// Output image, URL, or frame pattern (stdout when omitted)
    #[arg(long, short, global = true)]
    output: Option<String>,

    /// Staging directory for remote outputs and captures (overrides config)
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// config.toml, or a directory containing one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Describe the input image
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Annotate text along the bottom edge
    AddText {
        #[arg(default_value = "your text goes here")]
        text: String,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Blur a region
    Blur {
        #[arg(long, default_value_t = 0)]
        x: u32,
        #[arg(long, default_value_t = 0)]
        y: u32,
        #[arg(long, default_value_t = 80)]
        width: u32,
        #[arg(long, default_value_t = 80)]
        height: u32,
        /// Gaussian sigma
        #[arg(long, default_value_t = 8.0)]
        strength: f32,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Crop a region (does nothing without --width)
    Crop {
        #[arg(long, default_value_t = 0)]
        x: u32,
        #[arg(long, default_value_t = 0)]
        y: u32,
        #[arg(long)]
        width: Option<u32>,
        /// Defaults to the rest of the image
        #[arg(long)]
        height: Option<u32>,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Resize to a maximum geometry; *W or *H locks that side
    Resize {
        #[arg(default_value = "320x240")]
        geometry: String,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Scale by a factor
    Scale {
        factor: f64,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Shrink to fit within a geometry
    Thumbnail {
        geometry: String,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Rotate clockwise by degrees
    Rotate {
        #[arg(allow_negative_numbers = true)]
        degrees: f64,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Mirror top to bottom
    Flip {
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Mirror left to right
    Flop {
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Convert to grayscale
    Grayscale {
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Draw a rectangle outline
    Rectangle {
        #[command(flatten)]
        region: RegionArgs,
        #[arg(long, default_value = "#ff0000")]
        color: Color,
        #[arg(long, default_value_t = 2)]
        thickness: u32,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Draw another image on top
    Composite {
        /// Overlay image path or URL
        overlay: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        x: i64,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        y: i64,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Reduce to a palette of N colours
    Quantize {
        #[arg(default_value_t = 16)]
        colors: u32,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Histogram-equalize each colour channel
    Equalize {
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Black and white split at a luma level
    Threshold {
        #[arg(default_value_t = 128)]
        level: u8,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Darken towards the corners
    Vignette {
        /// 0 (none) to 1 (black corners)
        #[arg(long, default_value_t = 0.8)]
        strength: f32,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Pencil-sketch effect
    Sketch {
        #[arg(long, default_value_t = 4.0)]
        sigma: f32,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Re-encode in another format (png, jpg, gif, webp, tiff)
    Convert {
        format: String,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Vertical offset (percent) that best frames the image
    BestViewport,
    /// Crop a full-width band around the best viewport
    CropViewport {
        height: u32,
        #[command(flatten)]
        quality: QualityArg,
    },
    /// Grab the screen or the focused window
    CaptureScreen(CaptureArgs),
    /// Record numbered frames to the output pattern
    Screencast {
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
        #[command(flatten)]
        capture: CaptureArgs,
    },
    /// Assemble the input frames into an animated GIF
    Animate {
        /// Milliseconds per frame
        #[arg(long, default_value_t = 100)]
        delay: u32,
    },
    /// Show the output in the external viewer
    View {
        /// Print the viewer command without running it
        #[arg(long)]
        print_only: bool,
    },
    /// List every operation
    List,
    /// Search operations by regular expression
    Search { pattern: String },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

impl Command {
    /// Whether the operation reads pixels from `--input`.
    fn needs_input(&self) -> bool {
        !matches!(
            self,
            Command::CaptureScreen(_)
                | Command::Screencast { .. }
                | Command::View { .. }
                | Command::List
                | Command::Search { .. }
                | Command::GenConfig
        )
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::List => {
            output::print_commands(commands::list());
            return Ok(());
        }
        Command::Search { pattern } => {
            output::print_commands(&commands::search(pattern)?);
            return Ok(());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        _ => {}
    }

    let mut config = config::load_config(cli.config.as_deref().unwrap_or(Path::new(".")))?;
    if let Some(dir) = &cli.working_dir {
        config.working_dir = dir.clone();
    }

    let input = match cli.input.as_deref() {
        Some("-") => {
            let mut bytes = Vec::new();
            std::io::stdin().read_to_end(&mut bytes)?;
            Input::Blob(bytes)
        }
        Some(s) => Input::parse(s)?,
        None if cli.command.needs_input() => return Err("--input is required".into()),
        None => Input::Blob(Vec::new()),
    };
    let output = cli.output.as_deref().map(Output::parse).transpose()?;
    let session = ImageSession::new(input, output, config);

    let outcome = match cli.command {
        Command::Info { json } => {
            let info = session.info()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                output::print_info(&info);
            }
            return Ok(());
        }
        Command::AddText { text, quality } => session.add_text(&text, quality.quality)?,
        Command::Blur {
            x,
            y,
            width,
            height,
            strength,
            quality,
        } => session.blur(Region::new(x, y, width, height), strength, quality.quality)?,
        Command::Crop {
            x,
            y,
            width,
            height,
            quality,
        } => session.crop(
            Region::new(x, y, width.unwrap_or(0), height.unwrap_or(u32::MAX)),
            quality.quality,
        )?,
        Command::Resize { geometry, quality } => session.resize(&geometry, quality.quality)?,
        Command::Scale { factor, quality } => session.scale(factor, quality.quality)?,
        Command::Thumbnail { geometry, quality } => session.thumbnail(&geometry, quality.quality)?,
        Command::Rotate { degrees, quality } => session.rotate(degrees, quality.quality)?,
        Command::Flip { quality } => session.flip(quality.quality)?,
        Command::Flop { quality } => session.flop(quality.quality)?,
        Command::Grayscale { quality } => session.grayscale(quality.quality)?,
        Command::Rectangle {
            region,
            color,
            thickness,
            quality,
        } => session.rectangle(Region::from(region), color, thickness, quality.quality)?,
        Command::Composite {
            overlay,
            x,
            y,
            quality,
        } => session.composite(&Location::parse(&overlay), x, y, quality.quality)?,
        Command::Quantize { colors, quality } => session.quantize(colors, quality.quality)?,
        Command::Equalize { quality } => session.equalize(quality.quality)?,
        Command::Threshold { level, quality } => session.threshold(level, quality.quality)?,
        Command::Vignette { strength, quality } => session.vignette(strength, quality.quality)?,
        Command::Sketch { sigma, quality } => session.sketch(sigma, quality.quality)?,
        Command::Convert { format, quality } => session.convert(&format, quality.quality)?,
        Command::BestViewport => {
            output::print_viewport(session.best_viewport()?);
            return Ok(());
        }
        Command::CropViewport { height, quality } => {
            session.crop_viewport(height, quality.quality)?
        }
        Command::CaptureScreen(capture) => session.capture_screen(&CaptureRequest::from(capture))?,
        Command::Screencast { seconds, capture } => {
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|_| format!("invalid duration: {seconds} seconds"))?;
            session.screencast(duration, &CaptureRequest::from(capture))?
        }
        Command::Animate { delay } => session.animate(delay)?,
        Command::View { print_only } => {
            let argv = session.view(!print_only)?;
            if print_only {
                output::print_command_line(&argv);
            }
            return Ok(());
        }
        Command::List | Command::Search { .. } | Command::GenConfig => return Ok(()),
    };

    match outcome {
        Outcome::Encoded(images) => {
            let mut stdout = std::io::stdout().lock();
            for image in &images {
                stdout.write_all(&image.bytes)?;
            }
            stdout.flush()?;
        }
        other => output::print_outcome(&other),
    }
    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
