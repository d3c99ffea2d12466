// src/main.rs
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use spacetraveling::output::DeliveryTarget;
use spacetraveling::{
    build_site, serve, AppError, BuildSummary, CommandLineInput, ServeConfig, SiteCommand,
    SiteConfig,
};
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("spacetraveling.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Builds the site once and reports what was written.
async fn execute_build(config: &SiteConfig) -> Result<(), AppError> {
    let summary = build_site(config).await?;
    report_build(config, &summary);
    Ok(())
}

fn report_build(config: &SiteConfig, summary: &BuildSummary) {
    let written = summary
        .report
        .completed
        .iter()
        .filter(|completed| matches!(completed.operation, DeliveryTarget::WriteFile { .. }))
        .count();

    println!(
        "📄 {} post(s) across {} listing page(s).",
        summary.posts, summary.listing_pages
    );
    println!(
        "✓ {} file(s) written to {}",
        written,
        config.output_dir.display()
    );
    if config.is_preview() {
        println!("⚠️  Built from a preview ref: do not publish this output.");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    match cli.command {
        SiteCommand::Build(args) => {
            let config = SiteConfig::resolve(args.site)?;
            execute_build(&config).await?;
        }
        SiteCommand::Serve(args) => {
            let config = ServeConfig::resolve(args)?;
            serve(&config).await?;
        }
    }

    Ok(())
}
