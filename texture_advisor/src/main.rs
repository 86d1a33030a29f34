use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use texture_complexity::logging::{init_logging, log_operation_end, LogConfig};
use texture_complexity::normal_map::{explain_layout, preprocess_normal_map, LayoutDecision};
use texture_complexity::{
    analyze_batch, collect_files, detect_layout, AnalysisConfig, Diagnostics, PixelBuffer,
    Platform, SourceLayout, StrategyKind, TextureFormat, TextureId, TextureInput, IMAGE_EXTENSIONS,
};
use tracing::info;

mod report;

#[derive(Parser)]
#[command(name = "texture-advisor")]
#[command(version, about = "Texture complexity analyzer and compression advisor", long_about = None)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score textures and recommend divisor, resolution and format.
    Analyze {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(short, long)]
        recursive: bool,

        #[arg(short, long, value_enum, default_value = "human")]
        output: OutputFormat,

        /// fast, high-accuracy, perceptual or combined
        #[arg(short, long)]
        strategy: Option<StrategyKind>,

        /// desktop, mobile or auto
        #[arg(short, long)]
        platform: Option<Platform>,

        /// JSON analysis config.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Print the detected channel layout of a normal map.
    DetectLayout {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Format the map is stored in; two-channel formats skip sampling.
        #[arg(short, long)]
        format: Option<TextureFormat>,
    },

    /// Rewrite a normal map to canonical RGB.
    Renormalize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value = "auto")]
        layout: LayoutArg,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    Auto,
    Rg,
    Ag,
    Rgb,
}

const NORMAL_MAP_SUFFIXES: &[&str] = &["_n", "_normal", "_nrm"];
const EMISSION_SUFFIXES: &[&str] = &["_e", "_emission", "_emissive"];

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = init_logging("texture_advisor", LogConfig::default().with_level(level));

    match cli.command {
        Commands::Analyze {
            input,
            recursive,
            output,
            strategy,
            platform,
            config,
        } => {
            let mut config = match config {
                Some(path) => AnalysisConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => AnalysisConfig::default(),
            };
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            if let Some(platform) = platform {
                config.format.platform = platform;
            }
            run_analyze(&input, recursive, output, &config)?;
        }

        Commands::DetectLayout { file, format } => {
            let decision = explain_file_layout(&file, format.unwrap_or(TextureFormat::Rgba32))?;
            println!("{}: {} (rule: {})", file.display(), decision.layout, decision.rule);
            if let Some(signals) = decision.signals {
                println!("{}", serde_json::to_string_pretty(&signals)?);
            }
        }

        Commands::Renormalize {
            input,
            output,
            layout,
        } => {
            let pixels = load_pixels(&input)?;
            let layout = match layout {
                LayoutArg::Auto => detect_layout(TextureFormat::Rgba32, &pixels),
                LayoutArg::Rg => SourceLayout::Rg,
                LayoutArg::Ag => SourceLayout::Ag,
                LayoutArg::Rgb => SourceLayout::Rgb,
            };
            let canonical = preprocess_normal_map(&pixels, layout);
            canonical
                .to_rgba_image()?
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("{} ({}) -> {}", input.display(), layout, output.display());
        }
    }

    Ok(())
}

fn run_analyze(
    input: &Path,
    recursive: bool,
    output: OutputFormat,
    config: &AnalysisConfig,
) -> anyhow::Result<()> {
    let files = if input.is_file() {
        vec![input.to_path_buf()]
    } else if input.is_dir() {
        collect_files(input, IMAGE_EXTENSIONS, recursive)
    } else {
        bail!("Input path does not exist: {}", input.display());
    };
    if files.is_empty() {
        bail!("No textures found in {}", input.display());
    }

    let start = Instant::now();
    let pb = create_progress_bar(files.len() as u64, "Decoding", output == OutputFormat::Human)?;
    let loaded: Vec<Result<TextureInput, (TextureId, String)>> = files
        .par_iter()
        .progress_with(pb.clone())
        .map(|path| load_texture(path).map_err(|e| (texture_id(path), format!("{e:#}"))))
        .collect();
    pb.finish_and_clear();

    let mut inputs = Vec::with_capacity(loaded.len());
    let mut decode_errors = Vec::new();
    for item in loaded {
        match item {
            Ok(texture) => inputs.push(texture),
            Err(failure) => decode_errors.push(failure),
        }
    }

    let mut diagnostics = Diagnostics::new();
    let mut batch = analyze_batch(&inputs, config, &mut diagnostics);
    for (id, error) in decode_errors {
        batch.fail(id, error);
    }
    info!(textures = batch.total, "Analysis complete");

    match output {
        OutputFormat::Json => {
            let document = json!({
                "config": config,
                "report": batch,
                "warnings": diagnostics.warnings(),
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Human => report::print_batch_human(&batch, &diagnostics),
    }

    log_operation_end("analyze", start.elapsed(), batch.failed == 0);
    Ok(())
}

fn create_progress_bar(total: u64, prefix: &str, visible: bool) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return Ok(pb);
    }
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.cyan.bold} [{bar:30.green/black}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Two-channel formats are decided without decoding; anything else runs the
/// cascade once over the decoded pixels.
fn explain_file_layout(path: &Path, format: TextureFormat) -> anyhow::Result<LayoutDecision> {
    if format.is_two_channel() {
        return Ok(LayoutDecision {
            layout: SourceLayout::Rg,
            rule: "two-channel format",
            signals: None,
        });
    }
    let pixels = load_pixels(path)?;
    Ok(explain_layout(pixels.pixels()))
}

fn load_pixels(path: &Path) -> anyhow::Result<PixelBuffer> {
    PixelBuffer::open(path).with_context(|| format!("Failed to decode {}", path.display()))
}

fn load_texture(path: &Path) -> anyhow::Result<TextureInput> {
    let pixels = load_pixels(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut texture = TextureInput::new(texture_id(path), pixels);
    if has_suffix(&stem, NORMAL_MAP_SUFFIXES) {
        texture = texture.normal_map();
    }
    if has_suffix(&stem, EMISSION_SUFFIXES) {
        texture = texture.emission();
    }
    Ok(texture)
}

fn texture_id(path: &Path) -> TextureId {
    TextureId(path.display().to_string())
}

fn has_suffix(stem: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| stem.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_classification() {
        assert!(has_suffix("brick_n", NORMAL_MAP_SUFFIXES));
        assert!(has_suffix("brick_normal", NORMAL_MAP_SUFFIXES));
        assert!(has_suffix("lamp_emissive", EMISSION_SUFFIXES));
        assert!(!has_suffix("brick_albedo", NORMAL_MAP_SUFFIXES));
        assert!(!has_suffix("normalize", NORMAL_MAP_SUFFIXES));
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "texture-advisor",
            "analyze",
            "assets",
            "-r",
            "--strategy",
            "high-accuracy",
            "--platform",
            "mobile",
            "--output",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                recursive,
                strategy,
                platform,
                output,
                ..
            } => {
                assert!(recursive);
                assert_eq!(strategy, Some(StrategyKind::HighAccuracy));
                assert_eq!(platform, Some(Platform::Mobile));
                assert!(output == OutputFormat::Json);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_two_channel_layout_skips_decoding() {
        let missing = Path::new("does/not/exist.png");
        let decision = explain_file_layout(missing, TextureFormat::Bc5).unwrap();
        assert_eq!(decision.layout, SourceLayout::Rg);
        assert!(decision.signals.is_none());
        assert!(explain_file_layout(missing, TextureFormat::Rgba32).is_err());
    }

    #[test]
    fn test_file_layout_reports_rule_and_signals() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wall_n.png");
        image::RgbaImage::from_pixel(16, 16, image::Rgba([255, 128, 255, 128]))
            .save(&path)
            .unwrap();
        let decision = explain_file_layout(&path, TextureFormat::Rgba32).unwrap();
        assert_eq!(decision.layout, SourceLayout::Ag);
        assert_eq!(decision.rule, "strong AG signature");
        assert_eq!(decision.signals.unwrap().sample_count, 256);
    }

    #[test]
    fn test_load_texture_flags_normal_maps() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rock_nrm.png");
        image::RgbaImage::from_pixel(8, 8, image::Rgba([128, 128, 255, 255]))
            .save(&path)
            .unwrap();
        let texture = load_texture(&path).unwrap();
        assert!(texture.is_normal_map);
        assert!(!texture.is_emission);
        assert_eq!(texture.pixels.width(), 8);
    }
}
