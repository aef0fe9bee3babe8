// ABOUTME: Main entry point for the slides-creator program.
// ABOUTME: Provides CLI interface and maps pipeline failures to exit codes.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use slides_creator::{
    AspectRatio, Config, ConversionReport, ConvertRequest, Converter, Output, OutputTarget,
    SlideKind, SlidesError, Theme,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a markdown article into presentations
    Convert(ConvertArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Path to the markdown article
    article: PathBuf,

    /// Output backend
    #[arg(long, value_enum, default_value = "pptx")]
    output: OutputTarget,

    /// Visual theme
    #[arg(long, value_enum)]
    theme: Option<Theme>,

    /// Word budget for content slides
    #[arg(long)]
    max_words_per_slide: Option<usize>,

    /// Code lines per code slide
    #[arg(long)]
    include_code_lines: Option<usize>,

    /// Slide aspect ratio
    #[arg(long, value_enum)]
    aspect_ratio: Option<AspectRatio>,

    /// Plan again even when a cached plan matches
    #[arg(long)]
    force_regenerate: bool,

    /// Parse and plan only, print the outline and write nothing
    #[arg(long)]
    dry_run: bool,

    /// Leave speaker notes out of every output
    #[arg(long)]
    no_speaker_notes: bool,

    /// Root directory for generated presentations
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Google Slides credentials file
    #[arg(long)]
    google_credentials: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let code = match &cli.command {
        Commands::Convert(args) => {
            init_logging(args.verbose);
            match convert(args) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    exit_code(&e)
                }
            }
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// 1 for parse, filesystem and config failures, 2 for planning failures
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<SlidesError>() {
        Some(SlidesError::Planning(_)) => 2,
        _ => 1,
    }
}

fn convert(args: &ConvertArgs) -> anyhow::Result<i32> {
    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(path) = &args.google_credentials {
        config.google_credentials = Some(path.clone());
    }

    let request = ConvertRequest {
        source: args.article.clone(),
        targets: args.output.backends(),
        theme: config.theme_config(
            args.theme,
            args.max_words_per_slide,
            args.include_code_lines,
            args.aspect_ratio,
            !args.no_speaker_notes,
        ),
        output_root: config.output_dir.clone(),
        force_regenerate: args.force_regenerate,
        dry_run: args.dry_run,
    };

    let report = Converter::new(config)
        .convert(&request)
        .with_context(|| format!("Failed to convert {:?}", args.article))?;

    if request.dry_run {
        print_outline(&report);
        return Ok(0);
    }

    print_summary(&report);
    Ok(if report.has_failures() { 3 } else { 0 })
}

fn print_outline(report: &ConversionReport) {
    println!("{} ({} slides)", report.deck.title(), report.deck.len());
    for (i, slide) in report.deck.slides().iter().enumerate() {
        let detail = match &slide.kind {
            SlideKind::Code { language, .. } => {
                format!(" [{}, {} lines]", language, slide.body_lines.len())
            }
            SlideKind::Visual { image } => format!(" [{}]", image.path_or_url),
            _ => String::new(),
        };
        println!("{:>3}. {:<10} {}{}", i + 1, slide.kind.name(), slide.heading(), detail);
    }
}

fn print_summary(report: &ConversionReport) {
    if let Some(dir) = &report.output_dir {
        println!("Presentation directory: {:?}", dir);
    }
    if report.from_cache {
        println!("Reused cached slide plan");
    }
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(Output::File(path)) => println!("{}: {:?}", outcome.backend, path),
            Ok(Output::Remote(remote)) => println!("{}: {}", outcome.backend, remote.url),
            Err(e) => eprintln!("{}: FAILED - {}", outcome.backend, e.cause),
        }
    }
}
