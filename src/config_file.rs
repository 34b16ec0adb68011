use crate::cli::{Args, OutputFormat, ShapeArg};
use crate::image_processing::{
    batch::DriverConfig, CanvasSpec, MaskSpec, PlacementOffset, RenderSettings,
};
use crate::utils::{parse_extension_list, parse_hex_color, to_hex_color};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings profile shared by the command line (`--config`) and the GUI
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub name: Option<String>,
    pub config: SettingsJson,
}

#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsJson {
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub offset_x: Option<i32>,
    pub offset_y: Option<i32>,
    pub shape: Option<String>,
    pub diameter: Option<u32>,
    pub background: Option<String>,
    pub format: Option<String>,
    pub extensions: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Capture a render snapshot and directories as a profile
    pub fn from_settings(name: &str, settings: &RenderSettings, driver: &DriverConfig) -> Self {
        Self {
            name: Some(name.to_string()),
            config: SettingsJson {
                input_path: Some(driver.input_dir.display().to_string()),
                output_path: Some(driver.output_dir.display().to_string()),
                width: Some(settings.canvas.width),
                height: Some(settings.canvas.height),
                offset_x: Some(settings.offset.dx),
                offset_y: Some(settings.offset.dy),
                shape: Some(settings.mask.shape.to_string()),
                diameter: Some(settings.mask.diameter),
                background: Some(to_hex_color(settings.canvas.background)),
                format: Some(driver.output_format.to_string()),
                extensions: Some(driver.extensions.join(",")),
            },
        }
    }

    /// Apply the profile on top of `base`, ignoring fields that are absent
    /// or do not parse.
    pub fn apply_to(&self, base: RenderSettings) -> RenderSettings {
        let config = &self.config;
        let shape = config
            .shape
            .as_deref()
            .and_then(|s| s.parse::<ShapeArg>().ok())
            .map(Into::into);

        RenderSettings {
            canvas: CanvasSpec {
                width: config.width.unwrap_or(base.canvas.width),
                height: config.height.unwrap_or(base.canvas.height),
                background: config
                    .background
                    .as_deref()
                    .and_then(parse_hex_color)
                    .unwrap_or(base.canvas.background),
            },
            offset: PlacementOffset {
                dx: config.offset_x.unwrap_or(base.offset.dx),
                dy: config.offset_y.unwrap_or(base.offset.dy),
            },
            mask: MaskSpec {
                shape: shape.unwrap_or(base.mask.shape),
                diameter: config.diameter.unwrap_or(base.mask.diameter),
            },
        }
    }

    /// Apply the directories, output format and extensions of the profile
    /// on top of `base`. Absent or unparsable fields keep the base value.
    pub fn apply_to_driver(&self, base: DriverConfig) -> DriverConfig {
        let config = &self.config;
        let extensions = config
            .extensions
            .as_deref()
            .map(parse_extension_list)
            .filter(|list| !list.is_empty());

        DriverConfig {
            input_dir: config.input_path.as_ref().map(PathBuf::from).unwrap_or(base.input_dir),
            output_dir: config.output_path.as_ref().map(PathBuf::from).unwrap_or(base.output_dir),
            output_format: config
                .format
                .as_deref()
                .and_then(|f| f.parse::<OutputFormat>().ok())
                .unwrap_or(base.output_format),
            extensions: extensions.unwrap_or(base.extensions),
            ..base
        }
    }
}

/// True when any of `names` appears in the raw command line, either as a
/// separate token or with an attached value (`--size=1x1`, `-x10`).
fn flag_given(cli_args: &[String], names: &[&str]) -> bool {
    cli_args.iter().skip(1).any(|arg| {
        names.iter().any(|name| {
            if arg == name {
                return true;
            }
            if name.starts_with("--") {
                arg.starts_with(&format!("{}=", name))
            } else {
                arg.starts_with(name) && !arg.starts_with("--")
            }
        })
    })
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments.
    /// Command-line arguments take precedence over config file values.
    pub fn load_and_merge_config(&mut self, cli_args: &[String]) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let config = ConfigFile::load(&config_path)?;
            self.merge_from_config(config.config, cli_args)?;

            if self.verbose && !self.json_progress {
                eprintln!("Loaded configuration from: {:?}", config_path);
            }
        }
        Ok(())
    }

    fn merge_from_config(&mut self, config: SettingsJson, cli_args: &[String]) -> Result<()> {
        if !flag_given(cli_args, &["-i", "--input"]) {
            if let Some(input) = config.input_path {
                self.input_paths = vec![PathBuf::from(input)];
            }
        }

        if !flag_given(cli_args, &["-o", "--output"]) {
            if let Some(output) = config.output_path {
                self.output_dir = PathBuf::from(output);
            }
        }

        if !flag_given(cli_args, &["-s", "--size"]) && (config.width.is_some() || config.height.is_some()) {
            let (width, height) = self.parse_size().map_err(anyhow::Error::msg)?;
            self.size = format!(
                "{}x{}",
                config.width.unwrap_or(width),
                config.height.unwrap_or(height)
            );
        }

        if !flag_given(cli_args, &["-x", "--offset-x"]) {
            if let Some(dx) = config.offset_x {
                self.offset_x = dx;
            }
        }

        if !flag_given(cli_args, &["-y", "--offset-y"]) {
            if let Some(dy) = config.offset_y {
                self.offset_y = dy;
            }
        }

        if !flag_given(cli_args, &["--shape"]) {
            if let Some(shape) = config.shape {
                self.shape = shape
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid shape in config file: '{}'", shape))?;
            }
        }

        if !flag_given(cli_args, &["-d", "--diameter"]) {
            if let Some(diameter) = config.diameter {
                self.diameter = diameter;
            }
        }

        if !flag_given(cli_args, &["-b", "--background"]) {
            if let Some(background) = config.background {
                self.background = background;
            }
        }

        if !flag_given(cli_args, &["--format"]) {
            if let Some(format) = config.format {
                self.format = format
                    .parse::<OutputFormat>()
                    .map_err(|_| anyhow::anyhow!("Invalid format in config file: '{}'", format))?;
            }
        }

        if !flag_given(cli_args, &["--extensions"]) {
            if let Some(ext) = config.extensions {
                self.extensions_str = ext;
            }
        }

        Ok(())
    }
}
