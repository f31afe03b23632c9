//! Persistent CLI settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use singalong_core::recognizer::energy::EnergyRecognizerConfig;
use singalong_core::{OverflowPolicy, PipelineConfig, StretchDirection};

pub const DEFAULT_TRACK_NAME: &str = "Fly Me to the Moon";

/// A named reference song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTrack {
    pub name: String,
    /// WAV path. Relative paths resolve against the settings file's directory.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub tracks: Vec<ReferenceTrack>,
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub chunk_frames: usize,
    pub window_size: usize,
    pub overflow: OverflowPolicy,
    pub direction: StretchDirection,
    pub output_sample_rate: Option<u32>,
    pub energy_threshold: f32,
    pub energy_hangover_frames: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tracks: vec![ReferenceTrack {
                name: DEFAULT_TRACK_NAME.into(),
                path: PathBuf::from("tracks/fly-me-to-the-moon.wav"),
            }],
            backend: "energy".into(),
            model_path: None,
            chunk_frames: 4_000,
            window_size: 2_048,
            overflow: OverflowPolicy::Saturate,
            direction: StretchDirection::ReferenceToUser,
            output_sample_rate: None,
            energy_threshold: 0.02,
            energy_hangover_frames: 8,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.backend = normalize_backend(&self.backend);
        self.chunk_frames = self.chunk_frames.clamp(1, 1_000_000);
        self.window_size = normalize_window_size(self.window_size);
        self.output_sample_rate = self
            .output_sample_rate
            .filter(|r| *r > 0)
            .map(|r| r.clamp(8_000, 192_000));
        self.energy_threshold = self.energy_threshold.clamp(0.001, 0.5);
        self.energy_hangover_frames = self.energy_hangover_frames.min(100);
        self.model_path = self
            .model_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());

        let mut seen = Vec::new();
        self.tracks.retain(|t| {
            let key = t.name.trim().to_lowercase();
            if key.is_empty() || t.path.as_os_str().is_empty() || seen.contains(&key) {
                return false;
            }
            seen.push(key);
            true
        });
        for track in &mut self.tracks {
            track.name = track.name.trim().to_string();
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            chunk_frames: self.chunk_frames,
            window_size: self.window_size,
            overflow: self.overflow,
            direction: self.direction,
            output_sample_rate: self.output_sample_rate,
            ..PipelineConfig::default()
        }
    }

    pub fn energy_config(&self) -> EnergyRecognizerConfig {
        EnergyRecognizerConfig {
            threshold: self.energy_threshold,
            hangover_frames: self.energy_hangover_frames,
            ..EnergyRecognizerConfig::default()
        }
    }

    /// Case-insensitive lookup by track name.
    pub fn find_track(&self, name: &str) -> Option<&ReferenceTrack> {
        let wanted = name.trim();
        self.tracks
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(wanted))
    }
}

/// Canonical backend name. Unknown names pass through so they can be
/// reported when the recognizer is built.
pub fn normalize_backend(raw: &str) -> String {
    let backend = raw.trim().to_ascii_lowercase();
    match backend.as_str() {
        "" => "energy".into(),
        "vosk" | "kaldi" => "vosk".into(),
        _ => backend,
    }
}

/// Round down to a multiple of 4 inside [256, 16384].
pub fn normalize_window_size(raw: usize) -> usize {
    raw.clamp(256, 16_384) / 4 * 4
}

/// Resolve a `--reference` argument: a configured track name, else a path.
pub fn resolve_reference(settings: &AppSettings, settings_path: &Path, arg: &str) -> PathBuf {
    match settings.find_track(arg) {
        Some(track) if track.path.is_relative() => settings_path
            .parent()
            .map(|dir| dir.join(&track.path))
            .unwrap_or_else(|| track.path.clone()),
        Some(track) => track.path.clone(),
        None => PathBuf::from(arg),
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("singalong")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("singalong")
            .join("settings.json")
    }
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
