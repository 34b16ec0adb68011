use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::ProgressBar;
use std::time::Instant;

use framefit::cli::Args;
use framefit::image_processing::batch::BatchDriver;
use framefit::image_processing::MaskShape;
use framefit::json_output::JsonMessage;
use framefit::utils::{create_progress_bar, format_duration, validate_inputs};

fn main() -> Result<()> {
    let start_time = Instant::now();
    let mut args = Args::parse();

    // Profile values only fill flags that were not given explicitly
    let cli_args: Vec<String> = std::env::args().collect();
    args.load_and_merge_config(&cli_args)?;

    let json_mode = args.json_progress;

    if !json_mode {
        println!("{}", style("FrameFit - Canvas Fitting").bold().blue());
        println!("{}", style("Fit photos onto a colored canvas").dim());
        println!();
    }

    validate_inputs(&args)?;

    let settings = args.render_settings().map_err(anyhow::Error::msg)?;
    let driver_config = args.driver_config();

    if args.verbose && !json_mode {
        println!("{}", style("Configuration:").bold());
        println!(
            "  Canvas: {}x{} on {}",
            settings.canvas.width, settings.canvas.height, args.background
        );
        println!(
            "  Offset: {}, {}",
            settings.offset.dx, settings.offset.dy
        );
        match settings.mask.shape {
            MaskShape::Rectangle => println!("  Mask: rectangle"),
            MaskShape::Circle => {
                println!("  Mask: circle, diameter {}", settings.mask.diameter)
            }
        }
        println!("  Output format: {}", driver_config.output_format);
        println!("  Extensions: {:?}", driver_config.extensions);
        println!("  Output directory: {}", driver_config.output_dir.display());
        if driver_config.dry_run {
            println!("  Dry run mode: enabled (simulation only - no files will be created)");
        }
        println!();
    }

    let driver = BatchDriver::new(driver_config)?;
    let image_files = driver.discover_images(&args.input_paths)?;

    if image_files.is_empty() {
        if json_mode {
            JsonMessage::summary(0, 0, 0, start_time.elapsed().as_secs_f64());
        } else {
            println!(
                "{}",
                style("No images found with specified extensions").red()
            );
        }
        return Ok(());
    }

    let progress = if json_mode {
        ProgressBar::hidden()
    } else {
        create_progress_bar(image_files.len() as u64)
    };
    progress.set_message("Rendering images");

    let report = driver.generate(&image_files, &settings, |count, path| {
        progress.set_position(count as u64);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            progress.set_message(name.to_string());
        }
    });

    progress.finish_with_message("✓ Processing complete!");

    if json_mode {
        JsonMessage::summary(
            report.total(),
            report.saved(),
            report.failed(),
            start_time.elapsed().as_secs_f64(),
        );
        return Ok(());
    }

    println!();

    let dry_run_mode = args.dry_run;
    let header = if dry_run_mode {
        style("Dry Run Results Summary:").bold().cyan()
    } else {
        style("Results Summary:").bold().green()
    };
    println!("{}", header);

    let processed_label = if dry_run_mode {
        "Would be saved"
    } else {
        "Saved"
    };
    println!(
        "  {}: {}",
        processed_label,
        style(report.saved()).bold().green()
    );
    if report.failed() > 0 {
        println!("  Failed: {}", style(report.failed()).bold().red());
    }

    if args.verbose && report.saved() > 0 {
        println!();
        println!("{}", style("Rendered files:").bold().blue());
        for (i, result) in report.results.iter().enumerate() {
            let filename = result
                .input_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("unknown");
            println!(
                "  {}: {} → {} ({})",
                style(format!("#{}", i + 1)).dim(),
                style(filename).bold(),
                style(result.output_path.display()).cyan(),
                style(format_duration(result.processing_time)).dim()
            );
        }
    }

    println!();
    println!("{}", style("Performance:").bold().blue());
    println!(
        "  Total processing time: {}",
        style(format_duration(start_time.elapsed())).bold()
    );
    println!(
        "  Average time per image: {}",
        style(format_duration(report.duration / image_files.len() as u32)).dim()
    );

    println!();
    let location_label = if dry_run_mode {
        "Would be saved to"
    } else {
        "Output directory"
    };
    println!(
        "  {}: {}",
        location_label,
        driver.config().output_dir.display()
    );

    if report.failed() > 0 {
        println!();
        println!("{}", style("Errors encountered:").bold().red());
        for (i, failure) in report.failures.iter().enumerate() {
            let filename = failure
                .input_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("unknown");
            let kind = if failure.is_decode_error() {
                "unreadable image"
            } else {
                "write failed"
            };
            println!(
                "  {}: {} [{}] - {:#}",
                style(format!("#{}", i + 1)).dim(),
                style(filename).bold().red(),
                kind,
                failure.error
            );
        }

        println!();
        println!(
            "{}",
            style(format!(
                "⚠ {} file(s) skipped, the rest were processed",
                report.failed()
            ))
            .bold()
            .yellow()
        );
        println!("  Check the listed files and try again with --verbose for more details");
    }

    Ok(())
}
