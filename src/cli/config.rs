//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliBackground, CliSelection};
use crate::{
    backends::SegmenterSpec,
    config::{ComponentSelection, OutputFormat, ReplacementConfig},
    gradient::GradientPreset,
};
use anyhow::{Context, Result};

/// Convert CLI arguments to `ReplacementConfig` and friends
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `ReplacementConfig` from CLI arguments
    ///
    /// Starts from `--config` when given; explicit flags override the file.
    pub(crate) fn from_cli(cli: &Cli) -> Result<ReplacementConfig> {
        let mut config = match &cli.config {
            Some(path) => ReplacementConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ReplacementConfig::default(),
        };

        if let Some(threshold) = cli.threshold {
            config.extraction.probability_threshold = threshold;
        }
        if let Some(selection) = cli.selection {
            config.extraction.selection = match selection {
                CliSelection::Largest => ComponentSelection::Largest,
                CliSelection::PreferTopHalf => ComponentSelection::PreferTopHalf,
            };
        }
        if let Some(quality) = cli.jpeg_quality {
            config.jpeg_quality = quality;
        }
        if let Some(output) = &cli.output {
            if let Ok(format) = OutputFormat::from_path(output) {
                config.output_format = format;
            }
        }
        config.debug = config.debug || cli.verbose >= 2;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Logging verbosity: `-v` count, raised to debug level when the config asks for it
    pub(crate) fn verbosity(cli: &Cli, config: &ReplacementConfig) -> u8 {
        if config.debug {
            cli.verbose.max(1)
        } else {
            cli.verbose
        }
    }

    /// Segmenter described by `--segmenter` and `--model-size`
    pub(crate) fn segmenter(cli: &Cli) -> Result<SegmenterSpec> {
        let spec: SegmenterSpec = cli
            .segmenter
            .parse()
            .with_context(|| format!("Invalid --segmenter '{}'", cli.segmenter))?;
        let input_size = cli
            .model_size
            .as_deref()
            .map(parse_model_size)
            .transpose()?;
        Ok(spec.with_input_size(input_size))
    }

    pub(crate) fn preset(cli: &Cli) -> GradientPreset {
        match cli.background {
            CliBackground::Blue => GradientPreset::Blue,
            CliBackground::Gray => GradientPreset::Gray,
        }
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if let Some(output) = &cli.output {
            OutputFormat::from_path(output).context("Invalid output path")?;
        }
        let segmenter = Self::segmenter(cli)?;
        if cli.model_size.is_some() && segmenter.kind() != "tract" {
            anyhow::bail!("--model-size only applies to the tract segmenter");
        }
        Ok(())
    }
}

/// Parse `WIDTHxHEIGHT`
pub(crate) fn parse_model_size(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("Invalid model size '{value}', expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .with_context(|| format!("Invalid model width '{width}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .with_context(|| format!("Invalid model height '{height}'"))?;
    if width == 0 || height == 0 {
        anyhow::bail!("Model size must be non-zero, got {width}x{height}");
    }
    Ok((width, height))
}
