// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

//! Per-frame parameter set consumed by the simulation, plus its JSON persistence.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const SETTINGS_FILE_NAME: &str = "fluid_settings.json";

pub const ITERATIONS_RANGE: std::ops::RangeInclusive<u32> = 16..=128;
pub const RADIUS_RANGE: std::ops::RangeInclusive<f32> = 0.1..=1.0;
pub const SCALE_RANGE: std::ops::RangeInclusive<f32> = 0.1..=2.0;
pub const COLOR_DECAY_RANGE: std::ops::RangeInclusive<f32> = 0.0..=0.1;

/// Which field the composition step displays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visualize {
    #[default]
    Color,
    Velocity,
    Divergence,
    Pressure,
}

impl Visualize {
    pub const ALL: [Visualize; 4] = [
        Visualize::Color,
        Visualize::Velocity,
        Visualize::Divergence,
        Visualize::Pressure,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Visualize::Color => "Color",
            Visualize::Velocity => "Velocity",
            Visualize::Divergence => "Divergence",
            Visualize::Pressure => "Pressure",
        }
    }
}

/// Color mapping applied by the composition step. Each variant compiles to its
/// own pipeline through the `COLOR_MODE` override constant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorMode {
    Normal,
    Luminance,
    #[default]
    Spectral,
    Gradient,
}

impl ColorMode {
    pub const ALL: [ColorMode; 4] = [
        ColorMode::Normal,
        ColorMode::Luminance,
        ColorMode::Spectral,
        ColorMode::Gradient,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ColorMode::Normal => "Normal",
            ColorMode::Luminance => "Luminance",
            ColorMode::Spectral => "Spectral",
            ColorMode::Gradient => "Gradient",
        }
    }

    /// Value of the `COLOR_MODE` override in composition.wgsl.
    pub fn shader_constant(self) -> u32 {
        match self {
            ColorMode::Normal => 0,
            ColorMode::Luminance => 1,
            ColorMode::Spectral => 2,
            ColorMode::Gradient => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timestep {
    #[serde(rename = "1/15")]
    Fps15,
    #[serde(rename = "1/30")]
    Fps30,
    #[default]
    #[serde(rename = "1/60")]
    Fps60,
    #[serde(rename = "1/90")]
    Fps90,
    #[serde(rename = "1/120")]
    Fps120,
}

impl Timestep {
    pub const ALL: [Timestep; 5] = [
        Timestep::Fps15,
        Timestep::Fps30,
        Timestep::Fps60,
        Timestep::Fps90,
        Timestep::Fps120,
    ];

    pub fn seconds(self) -> f32 {
        1.0 / self.rate() as f32
    }

    pub fn label(self) -> &'static str {
        match self {
            Timestep::Fps15 => "1/15",
            Timestep::Fps30 => "1/30",
            Timestep::Fps60 => "1/60",
            Timestep::Fps90 => "1/90",
            Timestep::Fps120 => "1/120",
        }
    }

    fn rate(self) -> u32 {
        match self {
            Timestep::Fps15 => 15,
            Timestep::Fps30 => 30,
            Timestep::Fps60 => 60,
            Timestep::Fps90 => 90,
            Timestep::Fps120 => 120,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    pub simulate: bool,
    pub iterations: u32,
    pub radius: f32,
    pub scale: f32,
    pub color_decay: f32,
    pub boundaries: bool,
    pub add_color: bool,
    pub visualize: Visualize,
    pub color_mode: ColorMode,
    pub timestep: Timestep,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            simulate: true,
            iterations: 32,
            radius: 0.25,
            scale: 0.5,
            color_decay: 0.01,
            boundaries: true,
            add_color: true,
            visualize: Visualize::Color,
            color_mode: ColorMode::Spectral,
            timestep: Timestep::Fps60,
        }
    }
}

impl FluidConfig {
    pub fn default_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    pub fn load_from_disk(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&data)?;
        config.sanitize();
        Ok(config)
    }

    pub fn save_to_disk(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Clamps every numeric field into its documented range. The passes
    /// themselves never validate what they are given.
    pub fn sanitize(&mut self) {
        self.iterations = self
            .iterations
            .clamp(*ITERATIONS_RANGE.start(), *ITERATIONS_RANGE.end());
        self.radius = clamp_finite(self.radius, &RADIUS_RANGE, 0.25);
        self.scale = clamp_finite(self.scale, &SCALE_RANGE, 0.5);
        self.color_decay = clamp_finite(self.color_decay, &COLOR_DECAY_RANGE, 0.01);
    }

    pub fn dt(&self) -> f32 {
        self.timestep.seconds()
    }
}

fn clamp_finite(value: f32, range: &std::ops::RangeInclusive<f32>, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_control_panel() {
        let config = FluidConfig::default();
        assert!(config.simulate);
        assert_eq!(config.iterations, 32);
        assert_eq!(config.radius, 0.25);
        assert_eq!(config.scale, 0.5);
        assert_eq!(config.color_decay, 0.01);
        assert_eq!(config.visualize, Visualize::Color);
        assert_eq!(config.color_mode, ColorMode::Spectral);
        assert_eq!(config.timestep, Timestep::Fps60);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut config = FluidConfig {
            iterations: 4,
            radius: -1.0,
            scale: f32::NAN,
            color_decay: 3.0,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.iterations, 16);
        assert_eq!(config.radius, 0.1);
        assert_eq!(config.scale, 0.5);
        assert_eq!(config.color_decay, 0.1);

        config.iterations = 1000;
        config.sanitize();
        assert_eq!(config.iterations, 128);
    }

    #[test]
    fn timestep_maps_to_seconds() {
        assert!((Timestep::Fps15.seconds() - 1.0 / 15.0).abs() < 1e-7);
        assert!((Timestep::Fps120.seconds() - 1.0 / 120.0).abs() < 1e-7);
        let labels: Vec<_> = Timestep::ALL.iter().map(|t| t.label()).collect();
        assert_eq!(labels, ["1/15", "1/30", "1/60", "1/90", "1/120"]);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: FluidConfig =
            serde_json::from_str(r#"{ "iterations": 64, "timestep": "1/30" }"#).unwrap();
        assert_eq!(config.iterations, 64);
        assert_eq!(config.timestep, Timestep::Fps30);
        assert_eq!(config.radius, 0.25);
        assert_eq!(config.color_mode, ColorMode::Spectral);
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = std::env::temp_dir().join(format!("ribofluid-config-{}", std::process::id()));
        let path = dir.join("nested").join(SETTINGS_FILE_NAME);
        let config = FluidConfig {
            boundaries: false,
            color_mode: ColorMode::Gradient,
            ..Default::default()
        };
        config.save_to_disk(&path).unwrap();
        let loaded = FluidConfig::load_from_disk(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_dir_all(&dir);
    }
}
