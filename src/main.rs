use clap::{Parser, Subcommand, ValueEnum};
use lensframe::batch::{self, RenderJob, RenderedFile};
use lensframe::brand::LogoTable;
use lensframe::color::Color;
use lensframe::config::{self, CONFIG_FILE_NAME, LensframeConfig};
use lensframe::imaging::Compositor;
use lensframe::metadata::{ExifProvider, Metadata, MetadataProvider};
use lensframe::output;
use lensframe::preview::Previewer;
use lensframe::style::{BrandSelection, FrameStyle, Style};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, SystemTime};

/// How often `watch` checks its inputs for changes.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn version_string() -> &'static str {
    let hash = env!("LENSFRAME_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup, called exactly once
        Box::leak(format!("{}@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "lensframe")]
#[command(about = "Add a camera information bar to photos")]
#[command(long_about = "\
Add a camera information bar to photos

Reads the camera model, lens, exposure settings, date and GPS position from
a photo's EXIF tags and renders a copy with an information bar underneath:
model and date on the left, exposure and coordinates on the right, and the
camera brand's logo.

Style resolution (later wins):
  stock defaults → lensframe.toml → --adapt → command-line flags

Examples:
  lensframe render IMG_0001.jpg
  lensframe render IMG_0001.jpg --frame glass --blur 60 --hide date
  lensframe batch ~/Pictures/trip --out-dir framed/
  lensframe inspect IMG_0001.jpg --json

Run 'lensframe gen-config' to generate a documented lensframe.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./lensframe.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Frame a single photo
    Render {
        input: PathBuf,
        /// Output file (default: <stem><suffix>.jpg next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a data: URL instead of writing a file
        #[arg(long, conflicts_with = "output")]
        data_url: bool,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Frame every photo under a directory, in parallel
    Batch {
        dir: PathBuf,
        /// Write outputs here instead of next to each source
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Show the metadata lensframe reads from a photo
    Inspect {
        input: PathBuf,
        /// Print JSON instead of a field list
        #[arg(long)]
        json: bool,
    },
    /// Re-render a photo whenever it or the config file changes
    Watch {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// List brands with a logo
    Brands,
    /// Print a stock lensframe.toml with all options documented
    GenConfig,
}

/// Bar elements that can be shown or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Field {
    Model,
    Lens,
    Specs,
    Date,
    Gps,
    Logo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FrameArg {
    Solid,
    Glass,
}

/// Style overrides shared by the rendering commands.
#[derive(clap::Args, Clone, Debug, Default)]
struct StyleArgs {
    /// Turn lens and GPS lines on or off per photo, following its metadata
    #[arg(long)]
    adapt: bool,
    /// Elements to show (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    show: Vec<Field>,
    /// Elements to hide (comma-separated, wins over --show)
    #[arg(long, value_enum, value_delimiter = ',')]
    hide: Vec<Field>,
    /// Bar background
    #[arg(long, value_enum)]
    frame: Option<FrameArg>,
    /// Bar fill (solid) or tint (glass)
    #[arg(long)]
    frame_color: Option<Color>,
    #[arg(long)]
    text_color: Option<Color>,
    /// Bar height, % of photo height (5-25)
    #[arg(long)]
    padding: Option<u32>,
    /// Glass blur strength (0-100)
    #[arg(long)]
    blur: Option<u32>,
    /// Glass tint opacity, % (0-90)
    #[arg(long)]
    glass_opacity: Option<u32>,
    /// Logo brand: auto, none, or a name from `lensframe brands`
    #[arg(long)]
    brand: Option<String>,
    /// Replace the camera model text
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    lens: Option<String>,
    #[arg(long)]
    focal_length: Option<String>,
    #[arg(long)]
    aperture: Option<String>,
    #[arg(long)]
    shutter: Option<String>,
    #[arg(long)]
    iso: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    gps: Option<String>,
}

impl StyleArgs {
    /// Layer the flags over `style`.
    fn apply(&self, mut style: Style) -> Style {
        for (fields, visible) in [(&self.show, true), (&self.hide, false)] {
            for field in fields {
                let flag = match field {
                    Field::Model => &mut style.show_model,
                    Field::Lens => &mut style.show_lens,
                    Field::Specs => &mut style.show_tech_specs,
                    Field::Date => &mut style.show_date,
                    Field::Gps => &mut style.show_gps,
                    Field::Logo => &mut style.show_logo,
                };
                *flag = visible;
            }
        }
        if let Some(frame) = self.frame {
            style.frame_style = match frame {
                FrameArg::Solid => FrameStyle::Solid,
                FrameArg::Glass => FrameStyle::Glass,
            };
        }
        if let Some(color) = self.frame_color {
            style.frame_color = color;
        }
        if let Some(color) = self.text_color {
            style.text_color = color;
        }
        if let Some(brand) = &self.brand {
            style.brand = BrandSelection::parse(brand);
        }
        style.padding = self.padding.unwrap_or(style.padding);
        style.blur_strength = self.blur.unwrap_or(style.blur_strength);
        style.glass_opacity = self.glass_opacity.unwrap_or(style.glass_opacity);

        let overrides = [
            (&self.model, &mut style.custom_model),
            (&self.lens, &mut style.custom_lens),
            (&self.focal_length, &mut style.custom_focal_length),
            (&self.aperture, &mut style.custom_aperture),
            (&self.shutter, &mut style.custom_shutter_speed),
            (&self.iso, &mut style.custom_iso),
            (&self.date, &mut style.custom_date_time),
            (&self.gps, &mut style.custom_gps),
        ];
        for (flag, custom) in overrides {
            if let Some(value) = flag {
                *custom = value.clone();
            }
        }
        style.clamped()
    }

    /// Config style, adapted to `metadata` when requested, then the flags.
    fn resolve(&self, base: &Style, metadata: &Metadata) -> Style {
        if self.adapt {
            self.apply(base.adapted_to(metadata))
        } else {
            self.apply(base.clone())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Render {
            input,
            output,
            data_url,
            style,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let compositor = build_compositor(&config)?;
            let (image, metadata) = batch::load_photo(&ExifProvider::new(), &input)?;
            let style = style.resolve(&config.frame, &metadata);
            let rendered = compositor.render(&image, &metadata, &style)?;

            if data_url {
                println!("{}", rendered.to_data_url());
            } else {
                let output = output.unwrap_or_else(|| {
                    batch::output_path(&input, &config.output.suffix, None)
                });
                batch::write_rendered(&rendered, &output)?;
                println!(
                    "{}",
                    output::format_rendered(&RenderedFile {
                        source: input,
                        output,
                        width: rendered.width,
                        height: rendered.height,
                    })
                );
            }
        }
        Command::Batch {
            dir,
            out_dir,
            style,
        } => {
            let config = load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);
            let compositor = build_compositor(&config)?;
            let provider = ExifProvider::new();
            let resolve = |metadata: &Metadata| style.resolve(&config.frame, metadata);
            let files = batch::discover_images(&dir, &config.output.suffix)?;

            let job = RenderJob {
                compositor: &compositor,
                provider: &provider,
                style: &resolve,
                suffix: &config.output.suffix,
                output_dir: out_dir.as_deref(),
            };
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = batch::run_batch(&job, &files, Some(tx));
            if printer.join().is_err() {
                log::error!("Output thread panicked");
            }
            output::print_batch_summary(&summary);
            if summary.failed > 0 {
                return Err(format!("{} of {} photos failed", summary.failed, files.len()).into());
            }
        }
        Command::Inspect { input, json } => {
            let bytes = std::fs::read(&input)?;
            let metadata = ExifProvider::new().extract(&bytes)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else {
                output::print_metadata(&input, &metadata);
            }
        }
        Command::Watch {
            input,
            output,
            style,
        } => {
            let output =
                output.unwrap_or_else(|| batch::output_path(&input, "-preview", None));
            watch(cli.config.as_deref(), &input, &output, &style)?;
        }
        Command::Brands => {
            let config = load_config(cli.config.as_deref())?;
            match &config.logos.directory {
                Some(dir) => output::print_brands(&LogoTable::with_directory(dir)?),
                None => output::print_brands(LogoTable::builtin()),
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `--config`, or `./lensframe.toml` when present, or stock defaults.
///
/// An explicit path that does not exist is an error; the implicit one is
/// optional.
fn load_config(explicit: Option<&Path>) -> Result<LensframeConfig, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) if !path.exists() => {
            Err(format!("config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config(path)?),
        None => Ok(config::load_config(Path::new(CONFIG_FILE_NAME))?),
    }
}

fn build_compositor(config: &LensframeConfig) -> Result<Compositor, Box<dyn std::error::Error>> {
    let compositor = match &config.logos.directory {
        Some(dir) => Compositor::with_logos(Arc::new(LogoTable::with_directory(dir)?))?,
        None => Compositor::new()?,
    };
    Ok(compositor
        .logo_policy(config.output.logo_policy)
        .quality(config.quality()))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Render `input` through a [`Previewer`], re-submitting whenever the
/// config file changes and respawning it whenever the photo changes.
/// Runs until interrupted.
fn watch(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    args: &StyleArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_file = config_path.unwrap_or(Path::new(CONFIG_FILE_NAME));
    let mut config = load_config(config_path)?;
    let compositor = build_compositor(&config)?;
    let provider = ExifProvider::new();

    let spawn = |metadata_style: &Style| -> Result<_, Box<dyn std::error::Error>> {
        let (image, metadata) = batch::load_photo(&provider, input)?;
        let style = args.resolve(metadata_style, &metadata);
        let (mut previewer, rx) = Previewer::spawn(compositor.clone(), image, metadata.clone());
        previewer.submit(style);
        Ok((previewer, rx, metadata))
    };

    let (mut previewer, mut rx, mut metadata) = spawn(&config.frame)?;
    let mut config_stamp = modified(config_file);
    let mut input_stamp = modified(input);
    println!("Watching {} (Ctrl-C to stop)", input.display());

    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(preview) if preview.generation == previewer.generation() => {
                match preview.result {
                    Ok(rendered) => {
                        batch::write_rendered(&rendered, output)?;
                        println!(
                            "{}",
                            output::format_rendered(&RenderedFile {
                                source: input.to_path_buf(),
                                output: output.to_path_buf(),
                                width: rendered.width,
                                height: rendered.height,
                            })
                        );
                    }
                    Err(e) => log::error!("Render failed: {e}"),
                }
            }
            Ok(stale) => log::debug!("Dropping stale preview {}", stale.generation),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err("preview worker stopped".into());
            }
        }

        let stamp = modified(input);
        if stamp != input_stamp {
            input_stamp = stamp;
            log::info!("{} changed, reloading", input.display());
            match spawn(&config.frame) {
                Ok((p, r, m)) => (previewer, rx, metadata) = (p, r, m),
                Err(e) => log::warn!("Keeping previous photo: {e}"),
            }
        }

        let stamp = modified(config_file);
        if stamp != config_stamp {
            config_stamp = stamp;
            match load_config(config_path) {
                Ok(reloaded) => {
                    log::info!("{} changed, re-rendering", config_file.display());
                    config = reloaded;
                    previewer.submit(args.resolve(&config.frame, &metadata));
                }
                Err(e) => log::warn!("Ignoring invalid config: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn style_args_default_leaves_style_alone() {
        let style = StyleArgs::default().apply(Style::default());
        assert_eq!(style, Style::default());
    }

    #[test]
    fn hide_wins_over_show() {
        let args = StyleArgs {
            show: vec![Field::Lens, Field::Gps],
            hide: vec![Field::Gps, Field::Logo],
            ..StyleArgs::default()
        };
        let style = args.apply(Style::default());
        assert!(style.show_lens);
        assert!(!style.show_gps);
        assert!(!style.show_logo);
    }

    #[test]
    fn flags_override_config_and_clamp() {
        let args = StyleArgs {
            frame: Some(FrameArg::Glass),
            padding: Some(99),
            brand: Some("none".into()),
            model: Some("My Camera".into()),
            ..StyleArgs::default()
        };
        let style = args.apply(Style::default());
        assert_eq!(style.frame_style, FrameStyle::Glass);
        assert_eq!(style.padding, 25);
        assert_eq!(style.brand, BrandSelection::None);
        assert_eq!(style.custom_model, "My Camera");
    }

    #[test]
    fn adapt_runs_before_flags() {
        let metadata = Metadata {
            lens: "XF23mm".into(),
            ..Metadata::default()
        };
        let args = StyleArgs {
            adapt: true,
            hide: vec![Field::Lens],
            ..StyleArgs::default()
        };
        let style = args.resolve(&Style::default(), &metadata);
        assert!(!style.show_lens);
        assert!(!style.show_gps);
    }

    #[test]
    fn parses_render_command() {
        let cli = Cli::try_parse_from([
            "lensframe",
            "render",
            "a.jpg",
            "--show",
            "lens,gps",
            "--frame-color",
            "#222",
            "--frame",
            "glass",
        ])
        .unwrap();
        let Command::Render { style, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(style.show, vec![Field::Lens, Field::Gps]);
        assert_eq!(style.frame_color, Some(Color::rgb(0x22, 0x22, 0x22)));
        assert_eq!(style.frame, Some(FrameArg::Glass));
    }

    #[test]
    fn rejects_invalid_color() {
        assert!(
            Cli::try_parse_from(["lensframe", "render", "a.jpg", "--text-color", "nope"]).is_err()
        );
    }
}
