//! Subcommand handlers.
//!
//! Each handler loads its inputs, runs one core operation and writes the
//! result. Errors carry enough context to name the offending file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _};
use serde::Serialize;
use singalong_core::audio::{read_wav, write_wav};
use singalong_core::duration::{duration as clip_duration, DurationSource};
use singalong_core::{EnergyRecognizerFactory, Pipeline, RecognizerFactory, StretchDirection};
use tracing::{debug, info};

use crate::settings::{resolve_reference, save_settings, AppSettings};

pub struct Context {
    pub settings: AppSettings,
    pub settings_path: PathBuf,
}

impl Context {
    fn reference_path(&self, arg: &str) -> PathBuf {
        resolve_reference(&self.settings, &self.settings_path, arg)
    }

    fn pipeline(&self, direction: Option<&str>) -> anyhow::Result<Pipeline> {
        let mut config = self.settings.pipeline_config();
        if let Some(raw) = direction {
            config.direction = raw.parse::<StretchDirection>()?;
        }
        let factory = build_factory(&self.settings)?;
        Ok(Pipeline::new(config, factory)?)
    }
}

/// Recognizer backend named in the settings.
pub fn build_factory(settings: &AppSettings) -> anyhow::Result<Arc<dyn RecognizerFactory>> {
    match settings.backend.as_str() {
        "energy" => Ok(Arc::new(EnergyRecognizerFactory::new(settings.energy_config()))),
        "vosk" => vosk_factory(settings),
        other => bail!("unknown recognizer backend '{other}' (expected energy or vosk)"),
    }
}

#[cfg(feature = "vosk")]
fn vosk_factory(settings: &AppSettings) -> anyhow::Result<Arc<dyn RecognizerFactory>> {
    let Some(model) = settings.model_path.as_deref() else {
        bail!("the vosk backend needs --model <dir> or modelPath in settings");
    };
    let factory = singalong_core::VoskRecognizerFactory::load(model)
        .with_context(|| format!("loading Vosk model {}", model.display()))?;
    Ok(Arc::new(factory))
}

#[cfg(not(feature = "vosk"))]
fn vosk_factory(_settings: &AppSettings) -> anyhow::Result<Arc<dyn RecognizerFactory>> {
    bail!("this build has no vosk backend; rebuild with --features vosk")
}

fn load(path: &Path) -> anyhow::Result<singalong_core::AudioClip> {
    read_wav(path).with_context(|| format!("reading {}", path.display()))
}

pub fn align(
    ctx: &Context,
    user: &Path,
    reference: &str,
    out: &Path,
    direction: Option<&str>,
    report: Option<&Path>,
) -> anyhow::Result<()> {
    let pipeline = ctx.pipeline(direction)?;
    let reference = ctx.reference_path(reference);
    let user_clip = load(user)?;
    let reference_clip = load(&reference)?;

    let alignment = pipeline.align(&user_clip, &reference_clip)?;
    write_wav(out, &alignment.output, pipeline.config().overflow)
        .with_context(|| format!("writing {}", out.display()))?;

    let json = serde_json::to_string_pretty(&alignment.report)?;
    match report {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{json}"),
    }
    debug!(diagnostics = ?pipeline.diagnostics(), "align finished");
    info!(
        out = %out.display(),
        words = alignment.report.words.len(),
        secs = alignment.report.output_secs,
        "aligned output written"
    );
    Ok(())
}

pub fn fit(ctx: &Context, input: &Path, reference: &str, out: &Path) -> anyhow::Result<()> {
    let pipeline = ctx.pipeline(None)?;
    let reference = ctx.reference_path(reference);
    let target = clip_duration(DurationSource::WavFile(&reference))
        .with_context(|| format!("probing {}", reference.display()))?;
    let clip = load(input)?;

    let fitted = pipeline.fit_to_reference(&clip, target)?;
    write_wav(out, &fitted, pipeline.config().overflow)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("{:.3}", fitted.duration_secs());
    Ok(())
}

pub fn boundaries(ctx: &Context, input: &Path) -> anyhow::Result<()> {
    let pipeline = ctx.pipeline(None)?;
    let clip = load(input)?;
    let intervals = pipeline.detect(&clip)?;
    println!("{}", serde_json::to_string_pretty(&intervals)?);
    Ok(())
}

pub fn duration(input: &Path) -> anyhow::Result<()> {
    let secs = clip_duration(DurationSource::WavFile(input))
        .with_context(|| format!("probing {}", input.display()))?;
    println!("{secs:.6}");
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackListing {
    name: String,
    path: PathBuf,
    available: bool,
}

pub fn tracks(ctx: &Context) -> anyhow::Result<()> {
    let listing: Vec<TrackListing> = ctx
        .settings
        .tracks
        .iter()
        .map(|t| {
            let path = ctx.reference_path(&t.name);
            TrackListing {
                name: t.name.clone(),
                available: path.is_file(),
                path,
            }
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

pub fn settings(ctx: &Context, save: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&ctx.settings)?);
    if save {
        save_settings(&ctx.settings_path, &ctx.settings)
            .with_context(|| format!("writing {}", ctx.settings_path.display()))?;
        info!(path = %ctx.settings_path.display(), "settings saved");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use singalong_core::{AudioClip, OverflowPolicy};

    fn ctx_in(dir: &Path) -> Context {
        Context {
            settings: AppSettings::default(),
            settings_path: dir.join("settings.json"),
        }
    }

    #[test]
    fn energy_is_the_default_backend() {
        let factory = build_factory(&AppSettings::default()).unwrap();
        assert_eq!(factory.name(), "energy");
    }

    #[cfg(not(feature = "vosk"))]
    #[test]
    fn vosk_without_feature_is_an_error() {
        let settings = AppSettings {
            backend: "vosk".into(),
            ..AppSettings::default()
        };
        assert!(build_factory(&settings).is_err());
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let mut settings = AppSettings {
            backend: "whisper".into(),
            ..AppSettings::default()
        };
        settings.normalize();
        let err = build_factory(&settings).err().unwrap();
        assert!(err.to_string().contains("whisper"));
    }

    #[test]
    fn bad_direction_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ctx_in(dir.path()).pipeline(Some("sideways")).is_err());
    }

    #[test]
    fn fit_writes_reference_length() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_in(dir.path());
        let input = dir.path().join("in.wav");
        let reference = dir.path().join("ref.wav");
        let out = dir.path().join("out.wav");
        write_wav(&input, &AudioClip::silence(16_000, 1, 16_000).unwrap(), OverflowPolicy::Saturate).unwrap();
        write_wav(&reference, &AudioClip::silence(16_000, 1, 24_480).unwrap(), OverflowPolicy::Saturate).unwrap();

        fit(&ctx, &input, reference.to_str().unwrap(), &out).unwrap();
        assert_eq!(read_wav(&out).unwrap().frames(), 24_480);
    }

    #[test]
    fn settings_save_writes_effective_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx_in(dir.path());
        ctx.settings.chunk_frames = 1_234;
        settings(&ctx, true).unwrap();
        let reloaded = crate::settings::load_settings(&ctx.settings_path);
        assert_eq!(reloaded.chunk_frames, 1_234);
    }

    #[test]
    fn missing_input_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_in(dir.path());
        let err = boundaries(&ctx, &dir.path().join("absent.wav")).unwrap_err();
        assert!(format!("{err:#}").contains("absent.wav"));
    }
}
