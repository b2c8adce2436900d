//! ID photo backdrop CLI tool
//!
//! Replaces the background of one portrait photo with a gradient preset,
//! optionally protecting regions given as a stroke file.

use super::config::CliConfigBuilder;
use crate::{
    backends::{BackendFactory, DefaultBackendFactory},
    config::OutputFormat,
    gradient::GradientPreset,
    processor::BackgroundReplacer,
    session::EditSession,
    stroke::StrokePath,
    tracing_config::{init_cli_tracing, spans, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Replace the background of an ID photo with a gradient
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "idphoto-backdrop")]
pub struct Cli {
    /// Input image (JPEG or PNG)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file; format follows the extension [default: <INPUT>_<background>.<ext>]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Background gradient
    #[arg(short, long, value_enum, default_value_t = CliBackground::Blue)]
    pub background: CliBackground,

    /// JSON stroke file marking regions to keep: {"points": [{"x": 1, "y": 2}, ...]}
    #[arg(long, value_name = "JSON")]
    pub strokes: Option<PathBuf>,

    /// Segmenter as kind:argument (tract:<model.onnx>, uniform:<p>, mask:<image>)
    #[arg(short, long, default_value = "tract:models/selfie_segmenter_landscape.onnx")]
    pub segmenter: String,

    /// Model input size for the tract segmenter, as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH")]
    pub model_size: Option<String>,

    /// Foreground probability threshold (exclusive)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Subject selection among connected components
    #[arg(long, value_enum)]
    pub selection: Option<CliSelection>,

    /// Also write the combined foreground mask as a PNG
    #[arg(long, value_name = "PNG")]
    pub save_mask: Option<PathBuf>,

    /// Write processing metadata as JSON
    #[arg(long, value_name = "JSON")]
    pub metadata: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// JSON configuration file; explicit flags take precedence
    #[arg(short, long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliBackground {
    Blue,
    #[value(alias = "grey")]
    Gray,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliSelection {
    Largest,
    PreferTopHalf,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => Self::Console,
            CliLogFormat::Compact => Self::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Self::Json,
        }
    }
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let verbosity = CliConfigBuilder::verbosity(&cli, &config);
    let session_id = init_cli_tracing(verbosity, cli.log_format.into())
        .context("Failed to initialize tracing")?;
    let segmenter = CliConfigBuilder::segmenter(&cli)?;
    let preset = CliConfigBuilder::preset(&cli);

    let _session_span = spans::session(&session_id, segmenter.kind()).entered();
    info!("Segmenter: {}", segmenter);
    debug!("Configuration: {:?}", config);

    let backend = DefaultBackendFactory
        .create_backend(&segmenter)
        .with_context(|| format!("Failed to create segmenter '{segmenter}'"))?;
    let output_format = config.output_format;
    let replacer =
        BackgroundReplacer::new(config, backend).context("Failed to create background replacer")?;
    let mut session = EditSession::new(replacer);

    process_file(&cli, &mut session, preset, output_format)
}

fn process_file(
    cli: &Cli,
    session: &mut EditSession,
    preset: GradientPreset,
    output_format: OutputFormat,
) -> Result<()> {
    let _file_span = spans::file_processing(&cli.input, &preset.to_string()).entered();

    session
        .open(&cli.input)
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;

    if let Some(stroke_file) = &cli.strokes {
        let strokes = StrokePath::from_json_file(stroke_file)
            .with_context(|| format!("Failed to read strokes from {}", stroke_file.display()))?;
        if strokes.is_empty() {
            warn!("Stroke file {} has no points", stroke_file.display());
        }
        session.set_drawing_enabled(true);
        for point in strokes.points() {
            session.add_point(*point);
        }
        info!("Loaded {} stroke points", session.strokes().len());
    }

    let metadata = session
        .change_background(preset)
        .context("Failed to replace background")?;

    info!("📊 Processing breakdown for {}:", cli.input.display());
    if metadata.timings.model_load_ms > 0 {
        info!("  ├─ Model Load: {}ms", metadata.timings.model_load_ms);
    }
    info!("  ├─ Segmentation: {}ms", metadata.timings.segmentation_ms);
    info!("  ├─ Mask: {}ms", metadata.timings.mask_extraction_ms);
    info!("  ├─ Compositing: {}ms", metadata.timings.compositing_ms);
    info!(
        "  └─ Total: {}ms ({:.1}% of the image kept)",
        metadata.timings.total_ms,
        metadata.mask_statistics.foreground_ratio * 100.0
    );

    if let Some(metadata_path) = &cli.metadata {
        let json =
            serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
        std::fs::write(metadata_path, json)
            .with_context(|| format!("Failed to write {}", metadata_path.display()))?;
    }

    if let Some(mask_path) = &cli.save_mask {
        let mask = session
            .last_mask()
            .context("No mask available after processing")?;
        mask.save_png(mask_path)
            .with_context(|| format!("Failed to save mask to {}", mask_path.display()))?;
        info!("Mask saved to {}", mask_path.display());
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| generate_output_path(&cli.input, preset, output_format));
    session
        .save(&output)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    info!("Saved {}", output.display());

    Ok(())
}

/// `<dir>/<stem>_<preset>.<ext>` next to the input
fn generate_output_path(input_path: &Path, preset: GradientPreset, format: OutputFormat) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    let dir = input_path.parent().unwrap_or(Path::new("."));
    dir.join(format!(
        "{}_{}.{}",
        stem.to_string_lossy(),
        preset,
        format.extension()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_output_path() {
        assert_eq!(
            generate_output_path(Path::new("photos/me.jpeg"), GradientPreset::Blue, OutputFormat::Png),
            PathBuf::from("photos/me_blue.png")
        );
        assert_eq!(
            generate_output_path(Path::new("me.png"), GradientPreset::Gray, OutputFormat::Jpeg),
            PathBuf::from("me_gray.jpg")
        );
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "idphoto-backdrop",
            "in.jpg",
            "--background",
            "grey",
            "--strokes",
            "strokes.json",
            "--save-mask",
            "mask.png",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("in.jpg"));
        assert_eq!(cli.background, CliBackground::Gray);
        assert_eq!(cli.strokes, Some(PathBuf::from("strokes.json")));
        assert_eq!(cli.save_mask, Some(PathBuf::from("mask.png")));
        assert_eq!(cli.verbose, 0);

        assert!(Cli::try_parse_from(["idphoto-backdrop"]).is_err());
        assert!(Cli::try_parse_from(["idphoto-backdrop", "in.jpg", "-b", "green"]).is_err());
    }
}
