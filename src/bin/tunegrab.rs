use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tunegrab::{
    AudioFormat, AudioProbe, AudioQuality, CoverArtOptions, CoverFormat, DownloadOptions,
    Downloader, FfmpegLogLevel, OperationType, ProgressCallback, ProgressInfo, ThumbnailSource,
    Toolchain, TunegrabError,
};

const CLI_AFTER_HELP: &str = "Examples:\n  tunegrab download https://www.youtube.com/watch?v=dQw4w9WgXcQ\n  tunegrab download https://www.youtube.com/playlist?list=PL123 --playlist --format opus --quality 0\n  tunegrab download URL --cover-size 600 --square --progress\n  tunegrab probe downloads/song.mp3 --json\n  tunegrab embed song.mp3 cover.webp --square\n  tunegrab completions zsh > _tunegrab";

#[derive(Debug, Parser)]
#[command(
    name = "tunegrab",
    version,
    about = "Download audio from video URLs and embed the thumbnail as cover art",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Extractor binary.
    #[arg(long = "yt-dlp", env = "TUNEGRAB_YT_DLP", global = true)]
    yt_dlp: Option<PathBuf>,

    /// ffmpeg binary or the directory containing it.
    #[arg(long, env = "TUNEGRAB_FFMPEG", global = true)]
    ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download and convert audio, then embed cover art.
    #[command(
        about = "Download audio",
        visible_alias = "dl",
        after_help = "Examples:\n  tunegrab download URL\n  tunegrab download URL --format m4a --quality 256K --out-dir music\n  tunegrab download   (prompts for the URL)"
    )]
    Download {
        /// Video or playlist URL. Prompted for when omitted.
        url: Option<String>,
        /// Output directory.
        #[arg(long, env = "TUNEGRAB_OUTPUT_DIR", default_value = tunegrab::DEFAULT_OUTPUT_DIR)]
        out_dir: PathBuf,
        /// Audio format: best | mp3 | m4a | aac | flac | opus | vorbis | wav | alac.
        #[arg(long, default_value = "mp3")]
        format: String,
        /// Quality: 0 (best) to 10 for VBR, or a bit rate such as 320 or 192K.
        #[arg(long, default_value = "320")]
        quality: String,
        /// Download the whole playlist.
        #[arg(long)]
        playlist: bool,
        /// Do not embed the thumbnail.
        #[arg(long)]
        no_thumbnail: bool,
        /// Embed the thumbnail as downloaded, without converting it.
        #[arg(long, conflicts_with_all = ["cover_size", "square", "png"])]
        raw_thumbnail: bool,
        /// Keep thumbnail files after embedding.
        #[arg(long)]
        keep_thumbnails: bool,
        /// Do not fill empty title, artist, and album tags.
        #[arg(long)]
        no_tags: bool,
        /// Longest edge of the embedded cover in pixels.
        #[arg(long)]
        cover_size: Option<u32>,
        /// Center-crop the cover to a square.
        #[arg(long)]
        square: bool,
        /// Embed the cover as PNG instead of JPEG.
        #[arg(long)]
        png: bool,
        /// Skip playlist entries that fail to download.
        #[arg(long)]
        ignore_errors: bool,
        /// Extractor filename template.
        #[arg(long, default_value = "%(title)s.%(ext)s")]
        template: String,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print audio properties of a file and check it.
    #[command(
        about = "Inspect an audio file",
        visible_alias = "info",
        after_help = "Examples:\n  tunegrab probe downloads/song.mp3\n  tunegrab probe downloads/song.mp3 --json"
    )]
    Probe {
        /// Audio file path.
        input: PathBuf,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Embed an image as cover art into an existing audio file.
    #[command(about = "Embed cover art")]
    Embed {
        /// Audio file path.
        input: PathBuf,
        /// Image path or http(s) URL.
        thumbnail: String,
        /// Embed the image without converting it.
        #[arg(long, conflicts_with_all = ["cover_size", "square", "png"])]
        raw: bool,
        /// Longest edge of the embedded cover in pixels.
        #[arg(long)]
        cover_size: Option<u32>,
        /// Center-crop the cover to a square.
        #[arg(long)]
        square: bool,
        /// Embed the cover as PNG instead of JPEG.
        #[arg(long)]
        png: bool,
    },

    /// Remove thumbnail files that sit next to audio files.
    #[command(about = "Remove leftover thumbnails")]
    Clean {
        /// Directory to clean.
        #[arg(default_value = tunegrab::DEFAULT_OUTPUT_DIR)]
        dir: PathBuf,
        /// List files without deleting them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that the extractor and ffmpeg can be run.
    #[command(about = "Check external tools")]
    Doctor,

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_yes_no(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn prompt(question: &str) -> Result<String, Box<dyn std::error::Error>> {
    eprint!("{question}");
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

fn cover_options(cover_size: Option<u32>, square: bool, png: bool) -> CoverArtOptions {
    let mut options = CoverArtOptions::default().with_square(square);
    if let Some(size) = cover_size {
        options = options.with_max_dimension(size);
    }
    if png {
        options = options.with_format(CoverFormat::Png);
    }
    options
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<Option<FfmpegLogLevel>, TunegrabError> {
    let level = global
        .log_level
        .as_deref()
        .map(str::parse::<FfmpegLogLevel>)
        .transpose()?;
    if let Some(level) = level {
        tunegrab::set_ffmpeg_log_level(level);
    }
    Ok(level)
}

struct TerminalProgress {
    bar: ProgressBar,
    operation: Mutex<Option<OperationType>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self {
            bar: ProgressBar::new(0),
            operation: Mutex::new(None),
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Ok(mut operation) = self.operation.lock() {
            if *operation != Some(info.operation) {
                let template = match info.operation {
                    OperationType::Download => {
                        "{spinner:.green} {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}"
                    }
                    _ => "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                };
                if let Ok(style) = ProgressStyle::with_template(template) {
                    self.bar.set_style(style.progress_chars("##-"));
                }
                self.bar.reset();
                *operation = Some(info.operation);
            }
        }

        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);

        let message = match (info.operation, info.entry, info.item.as_deref()) {
            (OperationType::Download, Some((index, Some(count))), _) => {
                format!("downloading {index}/{count}")
            }
            (OperationType::Download, _, _) => "downloading".to_string(),
            (_, _, Some(item)) => item.to_string(),
            _ => String::new(),
        };
        self.bar.set_message(message);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);
    let log_level = apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Download {
            url,
            out_dir,
            format,
            quality,
            mut playlist,
            no_thumbnail,
            raw_thumbnail,
            keep_thumbnails,
            no_tags,
            cover_size,
            square,
            png,
            ignore_errors,
            template,
            json,
        } => {
            let url = match url {
                Some(url) => url,
                None => {
                    let url = prompt("Enter URL: ")?;
                    if !playlist {
                        playlist = parse_yes_no(&prompt("Is it a playlist? (yes/no): ")?);
                    }
                    url
                }
            };

            let mut options = DownloadOptions::new(url)
                .with_output_dir(out_dir)
                .with_audio_format(format.parse::<AudioFormat>()?)
                .with_quality(quality.parse::<AudioQuality>()?)
                .with_playlist(playlist)
                .with_output_template(template)
                .with_embed_thumbnail(!no_thumbnail)
                .with_clean_thumbnails(!keep_thumbnails)
                .with_fill_tags(!no_tags)
                .with_ignore_errors(ignore_errors)
                .with_cover_art(if raw_thumbnail {
                    None
                } else {
                    Some(cover_options(cover_size, square, png))
                });

            if let Some(binary) = &cli.global.yt_dlp {
                options = options.with_extractor(binary);
            }
            if let Some(location) = &cli.global.ffmpeg {
                options = options.with_ffmpeg_location(location);
            }
            if let Some(level) = log_level {
                options = options.with_ffmpeg_log_level(level);
            }

            let terminal_progress = cli.global.progress.then(|| Arc::new(TerminalProgress::new()));
            if let Some(progress) = &terminal_progress {
                options = options.with_progress(progress.clone());
            }

            let result = Downloader::new(options).run();
            if let Some(progress) = &terminal_progress {
                progress.finish();
            }

            let report = match result {
                Ok(report) => report,
                Err(error) => {
                    return Err(format!("An error occurred during download: {error}").into());
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
                if report.covers_failed() > 0 {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!("{} cover(s) could not be embedded", report.covers_failed())
                            .yellow()
                    );
                }
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    "Download completed successfully.".green()
                );
            }
        }
        Commands::Probe { input, json } => {
            let metadata = AudioProbe::probe(&input)?;
            let expected = input
                .extension()
                .and_then(|extension| extension.to_str())
                .and_then(|extension| extension.parse::<AudioFormat>().ok())
                .unwrap_or(AudioFormat::Best);
            let report = tunegrab::validate_output(&metadata, expected);

            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "codec": metadata.codec,
                    "sample_rate": metadata.sample_rate,
                    "channels": metadata.channels,
                    "bit_rate": metadata.bit_rate,
                    "has_cover_art": metadata.has_cover_art,
                    "tags": metadata.tags,
                    "validation": report,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                for key in ["title", "artist", "album"] {
                    if let Some(value) = metadata.tags.get(key) {
                        println!("{}: {value}", capitalize(key));
                    }
                }
                print!("{report}");
            }

            if !report.is_valid() {
                return Err(format!("{} failed validation", input.display()).into());
            }
        }
        Commands::Embed {
            input,
            thumbnail,
            raw,
            cover_size,
            square,
            png,
        } => {
            let bytes = ThumbnailSource::parse(&thumbnail).load(Duration::from_secs(30))?;
            let cover = if raw {
                tunegrab::raw_cover_art(&bytes)?
            } else {
                tunegrab::normalize_cover_art(&bytes, &cover_options(cover_size, square, png))?
            };
            tunegrab::embed_cover_art(&input, &cover, None)?;
            println!(
                "{} {} ({}x{} {})",
                "embedded".green().bold(),
                input.display(),
                cover.width,
                cover.height,
                cover.mime_type()
            );
        }
        Commands::Clean { dir, dry_run } => {
            let orphans = tunegrab::find_orphan_thumbnails(&dir);
            if dry_run {
                for path in &orphans {
                    println!("{}", path.display());
                }
                println!("{} file(s) would be removed", orphans.len());
            } else {
                let removed = tunegrab::remove_files(orphans);
                for path in &removed {
                    if cli.global.verbose {
                        eprintln!("removed {}", path.display());
                    }
                }
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!("Removed {} file(s) from {}", removed.len(), dir.display()).green()
                );
            }
        }
        Commands::Doctor => {
            let extractor = cli
                .global
                .yt_dlp
                .clone()
                .unwrap_or_else(|| PathBuf::from("yt-dlp"));
            let toolchain = Toolchain::detect(&extractor, cli.global.ffmpeg.as_deref());
            print_tool(&extractor, &toolchain.extractor);
            print_tool(&toolchain.ffmpeg_binary, &toolchain.ffmpeg);
            if !toolchain.is_ready() {
                return Err("required tools are missing".into());
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "tunegrab", &mut io::stdout());
        }
    }

    Ok(())
}

fn print_tool(name: &Path, result: &Result<String, TunegrabError>) {
    match result {
        Ok(version) => println!("{} {}: {version}", "ok".green().bold(), name.display()),
        Err(error) => println!("{} {error}", "missing".red().bold()),
    }
}

fn capitalize(value: &str) -> String {
    let mut characters = value.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands, capitalize, cover_options, parse_yes_no};
    use tunegrab::CoverFormat;

    #[test]
    fn yes_no_answers() {
        assert!(parse_yes_no("yes"));
        assert!(parse_yes_no(" Y \n"));
        assert!(!parse_yes_no("no"));
        assert!(!parse_yes_no(""));
    }

    #[test]
    fn cover_options_from_flags() {
        let options = cover_options(Some(600), true, true);
        assert_eq!(options.max_dimension, Some(600));
        assert!(options.square);
        assert_eq!(options.format, CoverFormat::Png);
    }

    #[test]
    fn download_defaults() {
        let cli = Cli::try_parse_from(["tunegrab", "download", "https://example.com/v"]).unwrap();
        match cli.command {
            Commands::Download {
                url,
                format,
                quality,
                playlist,
                template,
                no_tags,
                ..
            } => {
                assert_eq!(url.as_deref(), Some("https://example.com/v"));
                assert_eq!(format, "mp3");
                assert_eq!(quality, "320");
                assert!(!playlist);
                assert!(!no_tags);
                assert_eq!(template, "%(title)s.%(ext)s");
            }
            other => panic!("Expected Download, got {other:?}"),
        }
    }

    #[test]
    fn raw_thumbnail_conflicts_with_normalization_flags() {
        assert!(
            Cli::try_parse_from(["tunegrab", "download", "URL", "--raw-thumbnail", "--square"])
                .is_err()
        );
    }

    #[test]
    fn capitalize_words() {
        assert_eq!(capitalize("title"), "Title");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn no_tags_flag() {
        let cli =
            Cli::try_parse_from(["tunegrab", "download", "URL", "--no-tags"]).unwrap();
        assert!(matches!(cli.command, Commands::Download { no_tags: true, .. }));
    }
}
