use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::path::Path;

pub const SETTINGS_ENV: &str = "SWIRL_SETTINGS";
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub screen_width: usize,
    pub screen_height: usize,
    pub fps: u32,
    pub sim_resolution: usize,
    pub dt: f32,
    pub diffusion: f32,
    pub viscosity: f32,
    pub vorticity: f32,
    pub colorful: bool,
    pub bloom: bool,
    pub bloom_intensity: f32,
    pub bloom_threshold: f32,
    pub sunrays: bool,
    pub sunrays_weight: f32,
    pub background_color: [u8; 3],
    pub background_image: Option<String>,
    pub random_splats: bool,
    pub splat_frequency: u32,
    pub audio_threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screen_width: 1280,
            screen_height: 720,
            fps: 60,
            sim_resolution: 128,
            dt: 0.1,
            diffusion: 0.0001,
            viscosity: 0.000_000_1,
            vorticity: 1.0,
            colorful: true,
            bloom: true,
            bloom_intensity: 0.8,
            bloom_threshold: 0.6,
            sunrays: true,
            sunrays_weight: 0.9,
            background_color: [0, 0, 0],
            background_image: None,
            random_splats: false,
            splat_frequency: 10,
            audio_threshold: 50.0,
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid settings file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn load_or_default() -> Self {
        let path = std::env::var(SETTINGS_ENV).unwrap_or_else(|_| SETTINGS_FILE.to_owned());
        let path = Path::new(&path);
        match Self::load(path) {
            Ok(settings) => {
                info!("loaded settings from {}", path.display());
                settings
            }
            Err(err) => {
                if path.exists() {
                    warn!("{err:#}, using defaults");
                } else {
                    debug!("no settings file at {}, using defaults", path.display());
                }
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_sane_window() {
        let settings = Settings::default();
        assert_eq!(settings.screen_width, 1280);
        assert_eq!(settings.screen_height, 720);
        assert_eq!(settings.sim_resolution, 128);
        assert!(settings.sim_resolution >= 3);
        assert!(settings.dt > 0.0);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let settings = Settings::from_toml("dt = 0.25\nbloom = false\n").unwrap();
        assert_eq!(settings.dt, 0.25);
        assert!(!settings.bloom);
        assert_eq!(settings.sim_resolution, Settings::default().sim_resolution);
        assert_eq!(settings.vorticity, Settings::default().vorticity);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn background_settings_parse() {
        let settings =
            Settings::from_toml("background_color = [10, 20, 30]\nbackground_image = \"bg.png\"\n")
                .unwrap();
        assert_eq!(settings.background_color, [10, 20, 30]);
        assert_eq!(settings.background_image.as_deref(), Some("bg.png"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Settings::from_toml("dt = \"fast\"").is_err());
    }
}
