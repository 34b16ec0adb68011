use anyhow::{Context, Result};
use image::{Rgb, RgbaImage};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use super::{canvas, render_path, ComposeError, RenderSettings};
use crate::cli::OutputFormat;
use crate::json_output::JsonMessage;
use crate::utils::{
    error_println, get_file_extension, has_valid_extension, verbose_println, warn_println,
};

/// Extensions whose encoders keep the alpha channel
const ALPHA_EXTENSIONS: &[&str] = &["png", "webp", "tif", "tiff"];

/// Extensions accepted by default (file dialog and drop filter)
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    pub extensions: Vec<String>,
    pub verbose: bool,
    pub dry_run: bool,
    pub json_progress: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input_images"),
            output_dir: PathBuf::from("output_images"),
            output_format: OutputFormat::Auto,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            verbose: false,
            dry_run: false,
            json_progress: false,
        }
    }
}

#[derive(Debug)]
pub struct ProcessingResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub dimensions: (u32, u32),
    pub processing_time: Duration,
}

/// An input that was skipped, with the reason
#[derive(Debug)]
pub struct FailedInput {
    pub input_path: PathBuf,
    pub error: anyhow::Error,
}

impl FailedInput {
    /// True when the input itself could not be read as an image (as opposed
    /// to the output failing to write)
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self.error.downcast_ref::<ComposeError>(),
            Some(ComposeError::Decode { .. })
        )
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<ProcessingResult>,
    pub failures: Vec<FailedInput>,
    /// First successfully rendered image, kept for preview display
    pub first_output: Option<RgbaImage>,
    pub duration: Duration,
}

impl BatchReport {
    pub fn saved(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.saved() + self.failed()
    }
}

/// Sequential driver around the composer: one render per selected input,
/// one output file per success, failures recorded and skipped.
pub struct BatchDriver {
    config: DriverConfig,
}

impl BatchDriver {
    /// Validate the configuration and create the input and output
    /// directories (skipped in dry-run mode).
    pub fn new(config: DriverConfig) -> Result<Self> {
        if config.extensions.is_empty() {
            return Err(anyhow::anyhow!("No valid extensions specified"));
        }

        if !config.dry_run {
            for dir in [&config.input_dir, &config.output_dir] {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Expand files and directories into a sorted list of image files.
    ///
    /// With no inputs the configured input directory is scanned.
    pub fn discover_images(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let default_input = [self.config.input_dir.clone()];
        let inputs = if inputs.is_empty() {
            &default_input[..]
        } else {
            inputs
        };

        let mut image_files = Vec::new();

        for input in inputs {
            if !input.exists() {
                // The default input directory is not created in dry-run mode
                verbose_println(
                    self.config.verbose,
                    &format!("Skipping missing input: {}", input.display()),
                );
                continue;
            }

            verbose_println(self.config.verbose, &format!("Scanning: {}", input.display()));

            let walker = WalkDir::new(input).follow_links(false).max_depth(10);

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        self.warn(&format!("Skipping unreadable entry: {}", e));
                        continue;
                    }
                };
                let path = entry.path();

                if path.is_file() && has_valid_extension(path, &self.config.extensions) {
                    image_files.push(path.to_path_buf());
                }
            }
        }

        // Sort for consistent processing order
        image_files.sort();
        image_files.dedup();

        verbose_println(
            self.config.verbose,
            &format!("Found {} image files", image_files.len()),
        );
        Ok(image_files)
    }

    /// Warnings go to the console only; JSON mode keeps stdout machine-readable
    fn warn(&self, message: &str) {
        if !self.config.json_progress {
            warn_println(message);
        }
    }

    /// Keep only dropped paths with an accepted image extension
    pub fn accept_dropped(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths
            .iter()
            .filter(|path| has_valid_extension(path, &self.config.extensions))
            .cloned()
            .collect()
    }

    /// Render one input without writing anything
    pub fn preview(&self, input_path: &Path, settings: &RenderSettings) -> Result<RgbaImage, ComposeError> {
        render_path(input_path, settings)
    }

    /// Where the rendered version of `input_path` is written.
    ///
    /// The file keeps the input's stem. With `OutputFormat::Auto` the input
    /// extension is kept when its format stores alpha, otherwise `png` is used.
    pub fn output_path_for(&self, input_path: &Path) -> PathBuf {
        let stem = input_path.file_stem().unwrap_or_else(|| OsStr::new("image"));

        let extension: OsString = match self.config.output_format {
            OutputFormat::Png => "png".into(),
            OutputFormat::Jpg => "jpg".into(),
            OutputFormat::Auto => match (get_file_extension(input_path), input_path.extension()) {
                (Some(lower), Some(original)) if ALPHA_EXTENSIONS.contains(&lower.as_str()) => {
                    original.to_os_string()
                }
                _ => "png".into(),
            },
        };

        let mut file_name = stem.to_os_string();
        file_name.push(".");
        file_name.push(extension);
        self.config.output_dir.join(file_name)
    }

    /// `output_path_for`, with a `-N` suffix on the stem when an earlier
    /// input of the same batch already produced that path
    /// (`photo.jpg` and `photo.png` both map to `photo.png` in auto mode).
    fn unclaimed_output_path(&self, input_path: &Path, claimed: &HashSet<PathBuf>) -> PathBuf {
        let path = self.output_path_for(input_path);
        if !claimed.contains(&path) {
            return path;
        }

        let stem = path.file_stem().unwrap_or_else(|| OsStr::new("image")).to_os_string();
        let extension = path.extension().map(OsStr::to_os_string);

        let mut suffix = 1;
        loop {
            let mut file_name = stem.clone();
            file_name.push(format!("-{}", suffix));
            if let Some(extension) = &extension {
                file_name.push(".");
                file_name.push(extension);
            }

            let candidate = path.with_file_name(file_name);
            if !claimed.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Render and write every input in order.
    ///
    /// A failing input (unreadable, corrupt, unwritable output) is logged
    /// with its path and recorded in the report; the remaining inputs are
    /// still processed. Every success gets its own output file; inputs that
    /// would share a name get a numbered stem. `progress` is called after
    /// each input with the number of inputs handled so far.
    pub fn generate<F>(&self, inputs: &[PathBuf], settings: &RenderSettings, mut progress: F) -> BatchReport
    where
        F: FnMut(usize, &Path),
    {
        let start_time = Instant::now();
        let mut report = BatchReport::default();
        let mut claimed = HashSet::new();

        for (index, input_path) in inputs.iter().enumerate() {
            if self.config.json_progress {
                JsonMessage::progress(
                    index,
                    inputs.len(),
                    format!("Processing {}", input_path.display()),
                );
            }

            let output_path = self.unclaimed_output_path(input_path, &claimed);

            match self.process_single_image(input_path, output_path, settings) {
                Ok((result, rendered)) => {
                    claimed.insert(result.output_path.clone());
                    if self.config.json_progress {
                        JsonMessage::file_completed(
                            &result.input_path,
                            &result.output_path,
                            result.dimensions,
                            result.processing_time.as_millis(),
                        );
                    }
                    if report.first_output.is_none() {
                        report.first_output = Some(rendered);
                    }
                    report.results.push(result);
                }
                Err(error) => {
                    if self.config.json_progress {
                        JsonMessage::file_failed(input_path, format!("{:#}", error));
                    } else {
                        error_println(&format!("Skipping {}: {:#}", input_path.display(), error));
                    }
                    report.failures.push(FailedInput {
                        input_path: input_path.clone(),
                        error,
                    });
                }
            }

            progress(index + 1, input_path);
        }

        if self.config.json_progress {
            JsonMessage::progress(inputs.len(), inputs.len(), "Done");
        }

        report.duration = start_time.elapsed();
        report
    }

    fn process_single_image(
        &self,
        input_path: &Path,
        output_path: PathBuf,
        settings: &RenderSettings,
    ) -> Result<(ProcessingResult, RgbaImage)> {
        let start_time = Instant::now();
        verbose_println(self.config.verbose, &format!("Processing: {}", input_path.display()));

        let rendered = render_path(input_path, settings)?;

        if self.config.dry_run {
            verbose_println(
                self.config.verbose,
                &format!("Dry run, would write: {}", output_path.display()),
            );
        } else {
            save_rendered(&rendered, &output_path, settings.canvas.background)?;
            verbose_println(self.config.verbose, &format!("Saved: {}", output_path.display()));
        }

        let result = ProcessingResult {
            input_path: input_path.to_path_buf(),
            output_path,
            dimensions: rendered.dimensions(),
            processing_time: start_time.elapsed(),
        };

        Ok((result, rendered))
    }
}

/// Encode by the output extension. JPEG has no alpha, so the image is
/// flattened onto the canvas background first.
fn save_rendered(image: &RgbaImage, output_path: &Path, background: Rgb<u8>) -> Result<()> {
    let saved = match get_file_extension(output_path).as_deref() {
        Some("jpg") | Some("jpeg") => canvas::flatten(image, background).save(output_path),
        _ => image.save(output_path),
    };

    saved.with_context(|| format!("Failed to save image: {}", output_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::{CanvasSpec, MaskShape, MaskSpec};
    use image::{ImageBuffer, Rgba};
    use tempfile::TempDir;

    fn driver_in(dir: &TempDir, output_format: OutputFormat) -> BatchDriver {
        BatchDriver::new(DriverConfig {
            input_dir: dir.path().join("input_images"),
            output_dir: dir.path().join("output_images"),
            output_format,
            ..Default::default()
        })
        .unwrap()
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let img: RgbaImage = ImageBuffer::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        img.save(path).unwrap();
    }

    fn small_settings() -> RenderSettings {
        RenderSettings {
            canvas: CanvasSpec {
                width: 40,
                height: 40,
                background: Rgb([255, 255, 255]),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_new_creates_directories() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);

        assert!(driver.config().input_dir.is_dir());
        assert!(driver.config().output_dir.is_dir());
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let driver = BatchDriver::new(DriverConfig {
            input_dir: dir.path().join("in"),
            output_dir: dir.path().join("out"),
            dry_run: true,
            ..Default::default()
        })
        .unwrap();

        assert!(!driver.config().output_dir.exists());
    }

    #[test]
    fn test_output_path_for_auto_format() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);
        let out = &driver.config().output_dir;

        assert_eq!(driver.output_path_for(Path::new("a/photo.png")), out.join("photo.png"));
        assert_eq!(driver.output_path_for(Path::new("a/photo.PNG")), out.join("photo.PNG"));
        assert_eq!(driver.output_path_for(Path::new("a/photo.jpg")), out.join("photo.png"));
        assert_eq!(driver.output_path_for(Path::new("a/photo.jpeg")), out.join("photo.png"));
        assert_eq!(
            driver.output_path_for(Path::new("a/holiday.2024.jpg")),
            out.join("holiday.2024.png")
        );
    }

    #[test]
    fn test_output_path_for_forced_formats() {
        let dir = TempDir::new().unwrap();

        let driver = driver_in(&dir, OutputFormat::Jpg);
        assert_eq!(
            driver.output_path_for(Path::new("photo.png")),
            driver.config().output_dir.join("photo.jpg")
        );

        let driver = driver_in(&dir, OutputFormat::Png);
        assert_eq!(
            driver.output_path_for(Path::new("photo.jpg")),
            driver.config().output_dir.join("photo.png")
        );
    }

    #[test]
    fn test_discover_images_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);
        let input_dir = driver.config().input_dir.clone();

        write_png(&input_dir.join("b.png"), 4, 4);
        write_png(&input_dir.join("a.png"), 4, 4);
        std::fs::write(input_dir.join("notes.txt"), "not an image").unwrap();
        std::fs::create_dir(input_dir.join("nested")).unwrap();
        write_png(&input_dir.join("nested").join("c.png"), 4, 4);

        let found = driver.discover_images(&[]).unwrap();

        assert_eq!(
            found,
            vec![
                input_dir.join("a.png"),
                input_dir.join("b.png"),
                input_dir.join("nested").join("c.png"),
            ]
        );
    }

    #[test]
    fn test_accept_dropped_keeps_images_only() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);

        let dropped = vec![
            PathBuf::from("one.JPG"),
            PathBuf::from("two.gif"),
            PathBuf::from("three.jpeg"),
            PathBuf::from("folder"),
        ];

        assert_eq!(
            driver.accept_dropped(&dropped),
            vec![PathBuf::from("one.JPG"), PathBuf::from("three.jpeg")]
        );
    }

    #[test]
    fn test_generate_skips_undecodable_input() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);
        let input_dir = driver.config().input_dir.clone();

        let first = input_dir.join("first.png");
        let broken = input_dir.join("broken.png");
        let third = input_dir.join("third.png");
        write_png(&first, 80, 40);
        std::fs::write(&broken, b"this is not a png").unwrap();
        write_png(&third, 20, 60);

        let inputs = vec![first.clone(), broken.clone(), third.clone()];
        let mut calls = Vec::new();
        let report = driver.generate(&inputs, &small_settings(), |count, _| calls.push(count));

        assert_eq!(report.saved(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].input_path, broken);
        assert!(report.failures[0].is_decode_error());
        assert_eq!(calls, vec![1, 2, 3]);

        let out = &driver.config().output_dir;
        assert!(out.join("first.png").is_file());
        assert!(out.join("third.png").is_file());
        assert!(!out.join("broken.png").exists());

        let written = image::open(out.join("first.png")).unwrap();
        assert_eq!((written.width(), written.height()), (40, 40));
        assert_eq!(report.first_output.unwrap().dimensions(), (40, 40));
    }

    #[test]
    fn test_generate_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);

        let missing = dir.path().join("gone.jpg");
        let report = driver.generate(&[missing.clone()], &small_settings(), |_, _| {});

        assert_eq!(report.saved(), 0);
        assert_eq!(report.failures[0].input_path, missing);
        assert!(report.failures[0].is_decode_error());
        assert!(report.first_output.is_none());
    }

    #[test]
    fn test_jpeg_input_keeps_circle_alpha_in_png_output() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);
        let input = driver.config().input_dir.join("portrait.jpg");
        image::RgbImage::from_pixel(60, 60, Rgb([10, 120, 200]))
            .save(&input)
            .unwrap();

        let mut settings = small_settings();
        settings.mask = MaskSpec {
            shape: MaskShape::Circle,
            diameter: 30,
        };

        let report = driver.generate(&[input], &settings, |_, _| {});
        assert_eq!(report.saved(), 1);

        let output_path = &report.results[0].output_path;
        assert_eq!(output_path.extension().unwrap(), "png");

        let written = image::open(output_path).unwrap().to_rgba8();
        assert_eq!(written.get_pixel(0, 0)[3], 0);
        assert_eq!(written.get_pixel(20, 20)[3], 255);
    }

    #[test]
    fn test_jpg_format_flattens_onto_background() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Jpg);
        let input = driver.config().input_dir.join("logo.png");
        write_png(&input, 10, 10);

        let mut settings = small_settings();
        settings.mask.shape = MaskShape::Circle;
        settings.mask.diameter = 20;

        let report = driver.generate(&[input], &settings, |_, _| {});
        assert_eq!(report.saved(), 1, "failures: {:?}", report.failures);

        let written = image::open(&report.results[0].output_path).unwrap();
        assert_eq!((written.width(), written.height()), (40, 40));
        // Transparent corner becomes (nearly) white after flattening and JPEG
        let corner = written.to_rgb8().get_pixel(0, 0).0;
        assert!(corner.iter().all(|&c| c > 240), "corner was {:?}", corner);
    }

    #[test]
    fn test_same_stem_inputs_get_distinct_outputs() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);
        let input_dir = driver.config().input_dir.clone();

        let jpg = input_dir.join("photo.jpg");
        image::RgbImage::from_pixel(30, 30, Rgb([10, 120, 200]))
            .save(&jpg)
            .unwrap();
        let png = input_dir.join("photo.png");
        write_png(&png, 30, 30);

        let inputs = driver.discover_images(&[]).unwrap();
        assert_eq!(inputs, vec![jpg, png]);

        let report = driver.generate(&inputs, &small_settings(), |_, _| {});
        assert_eq!(report.saved(), 2);

        let out = &driver.config().output_dir;
        assert_eq!(report.results[0].output_path, out.join("photo.png"));
        assert_eq!(report.results[1].output_path, out.join("photo-1.png"));

        let on_disk = std::fs::read_dir(out).unwrap().count();
        assert_eq!(on_disk, report.saved());
    }

    #[test]
    fn test_same_name_in_sibling_folders_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Png);
        let input_dir = driver.config().input_dir.clone();

        for folder in ["a", "b", "c"] {
            std::fs::create_dir(input_dir.join(folder)).unwrap();
            write_png(&input_dir.join(folder).join("cover.png"), 8, 8);
        }

        let inputs = driver.discover_images(&[]).unwrap();
        let report = driver.generate(&inputs, &small_settings(), |_, _| {});

        let out = &driver.config().output_dir;
        let names: Vec<PathBuf> = report.results.iter().map(|r| r.output_path.clone()).collect();
        assert_eq!(
            names,
            vec![out.join("cover.png"), out.join("cover-1.png"), out.join("cover-2.png")]
        );
        assert_eq!(std::fs::read_dir(out).unwrap().count(), 3);
    }

    #[test]
    fn test_failed_input_does_not_claim_output_name() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Png);
        let input_dir = driver.config().input_dir.clone();

        let broken = input_dir.join("photo.jpg");
        std::fs::write(&broken, b"not a jpeg").unwrap();
        let good = input_dir.join("photo.png");
        write_png(&good, 8, 8);

        let report = driver.generate(&[broken, good], &small_settings(), |_, _| {});

        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.results[0].output_path,
            driver.config().output_dir.join("photo.png")
        );
    }

    #[test]
    fn test_dry_run_with_missing_input_dir_finds_nothing() {
        let dir = TempDir::new().unwrap();
        let driver = BatchDriver::new(DriverConfig {
            input_dir: dir.path().join("input_images"),
            output_dir: dir.path().join("output_images"),
            dry_run: true,
            ..Default::default()
        })
        .unwrap();

        assert!(!driver.config().input_dir.exists());
        assert!(driver.discover_images(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_input_does_not_hide_the_others() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Auto);
        let present = dir.path().join("present.png");
        write_png(&present, 4, 4);

        let found = driver
            .discover_images(&[dir.path().join("vanished"), present.clone()])
            .unwrap();

        assert_eq!(found, vec![present]);
    }

    #[test]
    fn test_dry_run_writes_nothing_but_reports() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.png");
        write_png(&input, 10, 10);

        let driver = BatchDriver::new(DriverConfig {
            input_dir: dir.path().join("in"),
            output_dir: dir.path().join("out"),
            dry_run: true,
            ..Default::default()
        })
        .unwrap();

        let report = driver.generate(&[input], &small_settings(), |_, _| {});

        assert_eq!(report.saved(), 1);
        assert!(!report.results[0].output_path.exists());
    }

    #[test]
    fn test_preview_matches_generated_output() {
        let dir = TempDir::new().unwrap();
        let driver = driver_in(&dir, OutputFormat::Png);
        let input = driver.config().input_dir.join("photo.png");
        write_png(&input, 33, 17);

        let preview = driver.preview(&input, &small_settings()).unwrap();
        let report = driver.generate(&[input], &small_settings(), |_, _| {});

        assert_eq!(Some(preview), report.first_output);
    }
}
