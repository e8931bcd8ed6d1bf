// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Provides sensible defaults if config file is missing or has errors.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound on frame slots; more than this only adds latency.
pub const MAX_FRAMES_IN_FLIGHT: usize = 4;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub geometry: GeometryConfig,
    pub shaders: ShaderConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "trigrid".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// How vertex data reaches the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VertexUpload {
    /// Host-visible staging buffer copied into a device-local buffer
    #[default]
    Staged,
    /// Single host-visible buffer the draw reads directly
    Mapped,
}

/// What the frame counter does when a repair aborts a frame before submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepairSlotPolicy {
    /// Move to the next slot, same as a presented frame
    #[default]
    Advance,
    /// Retry the same slot on the next frame
    Hold,
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub present_mode: String,
    pub clear_color: [f32; 4],
    pub max_frames_in_flight: usize,
    pub vertex_upload: VertexUpload,
    pub repair_slot_policy: RepairSlotPolicy,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            present_mode: "mailbox".to_string(),
            clear_color: [1.0, 1.0, 1.0, 1.0],
            max_frames_in_flight: 2,
            vertex_upload: VertexUpload::default(),
            repair_slot_policy: RepairSlotPolicy::default(),
        }
    }
}

/// Procedural grid settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub max_triangles: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self { max_triangles: 20_000 }
    }
}

/// Precompiled SPIR-V locations
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/grid.vert.spv"),
            fragment: PathBuf::from("shaders/grid.frag.spv"),
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_to_file: bool,
    pub log_file: String,
    pub show_fps: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_to_file: false,
            log_file: "trigrid.log".to_string(),
            show_fps: true,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Frame slot count, kept within 1..=MAX_FRAMES_IN_FLIGHT
    pub fn frames_in_flight(&self) -> usize {
        let requested = self.graphics.max_frames_in_flight;
        let clamped = requested.clamp(1, MAX_FRAMES_IN_FLIGHT);
        if clamped != requested {
            log::warn!(
                "max_frames_in_flight = {} out of range, using {}",
                requested,
                clamped
            );
        }
        clamped
    }

    /// Get the preferred present mode as Vulkan enum
    pub fn get_present_mode(&self) -> ash::vk::PresentModeKHR {
        match self.graphics.present_mode.to_lowercase().as_str() {
            "immediate" => ash::vk::PresentModeKHR::IMMEDIATE,
            "mailbox" => ash::vk::PresentModeKHR::MAILBOX,
            "fifo" => ash::vk::PresentModeKHR::FIFO,
            "fifo_relaxed" => ash::vk::PresentModeKHR::FIFO_RELAXED,
            _ => {
                log::warn!(
                    "Unknown present mode '{}', defaulting to MAILBOX",
                    self.graphics.present_mode
                );
                ash::vk::PresentModeKHR::MAILBOX
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.graphics.max_frames_in_flight, 2);
        assert_eq!(config.graphics.clear_color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(config.graphics.vertex_upload, VertexUpload::Staged);
        assert_eq!(config.graphics.repair_slot_policy, RepairSlotPolicy::Advance);
        assert_eq!(config.geometry.max_triangles, 20_000);
        assert_eq!(config.shaders.vertex, PathBuf::from("shaders/grid.vert.spv"));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml(
            r#"
            [graphics]
            vertex_upload = "mapped"
            repair_slot_policy = "hold"

            [window]
            width = 640
            "#,
        )
        .unwrap();

        assert_eq!(config.graphics.vertex_upload, VertexUpload::Mapped);
        assert_eq!(config.graphics.repair_slot_policy, RepairSlotPolicy::Hold);
        assert_eq!(config.graphics.present_mode, "mailbox");
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
    }

    #[test]
    fn unknown_upload_strategy_is_rejected() {
        assert!(Config::from_toml("[graphics]\nvertex_upload = \"streamed\"").is_err());
    }

    #[test]
    fn frames_in_flight_is_clamped() {
        let mut config = Config::default();
        config.graphics.max_frames_in_flight = 0;
        assert_eq!(config.frames_in_flight(), 1);
        config.graphics.max_frames_in_flight = 16;
        assert_eq!(config.frames_in_flight(), MAX_FRAMES_IN_FLIGHT);
        config.graphics.max_frames_in_flight = 3;
        assert_eq!(config.frames_in_flight(), 3);
    }

    #[test]
    fn present_mode_names_map_to_vulkan() {
        let mut config = Config::default();
        assert_eq!(config.get_present_mode(), vk::PresentModeKHR::MAILBOX);
        config.graphics.present_mode = "FIFO_Relaxed".to_string();
        assert_eq!(config.get_present_mode(), vk::PresentModeKHR::FIFO_RELAXED);
        config.graphics.present_mode = "vsync-please".to_string();
        assert_eq!(config.get_present_mode(), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from_path("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.window.title, "trigrid");
    }
}
