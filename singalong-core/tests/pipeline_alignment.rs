use std::f32::consts::PI;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use singalong_core::audio::{read_wav, write_wav};
use singalong_core::{
    AudioClip, EnergyRecognizerFactory, OverflowPolicy, Pipeline, PipelineConfig, Recognizer,
    RecognizerFactory, ScriptedRecognizerFactory, SingalongError, StretchDirection,
};

const RATE: u32 = 16_000;

/// Clip of `total_ms` silence with 440 Hz bursts at the given millisecond spans.
fn bursts(total_ms: usize, spans: &[(usize, usize)], amplitude: f32) -> AudioClip {
    let frames = RATE as usize * total_ms / 1_000;
    let mut samples = vec![0.0f32; frames];
    for &(start, end) in spans {
        let a = RATE as usize * start / 1_000;
        let b = RATE as usize * end / 1_000;
        for (i, s) in samples[a..b].iter_mut().enumerate() {
            *s = amplitude * (2.0 * PI * 440.0 * i as f32 / RATE as f32).sin();
        }
    }
    AudioClip::mono(RATE, samples).unwrap()
}

fn energy_pipeline(config: PipelineConfig) -> Pipeline {
    Pipeline::new(config, Arc::new(EnergyRecognizerFactory::default())).unwrap()
}

struct BrokenFactory;

impl RecognizerFactory for BrokenFactory {
    fn name(&self) -> &str {
        "broken"
    }

    fn create(&self, _sample_rate: u32) -> singalong_core::Result<Box<dyn Recognizer>> {
        Err(SingalongError::EngineInit("model directory not found".into()))
    }
}

#[test]
fn reference_words_take_user_durations() {
    let user = bursts(1_100, &[(100, 300), (700, 1_000)], 0.5);
    let reference = bursts(1_100, &[(200, 600), (800, 1_000)], 0.5);
    let pipeline = energy_pipeline(PipelineConfig::default());

    let alignment = pipeline.align(&user, &reference).unwrap();
    let report = &alignment.report;
    assert_eq!(report.words.len(), 2);
    assert_eq!(report.words[0].output_frames, 3_200);
    assert_eq!(report.words[1].output_frames, 4_800);
    assert_abs_diff_eq!(report.words[0].ratio.unwrap(), 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(report.words[1].ratio.unwrap(), 1.5, epsilon = 1e-9);

    // Concatenation length is the sum of the stretched words.
    assert_eq!(alignment.output.frames(), 8_000);
    assert_eq!(alignment.output.sample_rate(), RATE);
}

#[test]
fn user_words_take_reference_durations() {
    let user = bursts(1_100, &[(100, 300), (700, 1_000)], 0.5);
    let reference = bursts(1_100, &[(200, 600), (800, 1_000)], 0.5);
    let config = PipelineConfig {
        direction: StretchDirection::UserToReference,
        ..Default::default()
    };
    let out = energy_pipeline(config).inference(&user, &reference).unwrap();
    assert_eq!(out.frames(), 6_400 + 3_200);
}

#[test]
fn unequal_word_counts_zip_to_the_shorter_list() {
    let user = bursts(1_100, &[(100, 300)], 0.5);
    let reference = bursts(1_100, &[(200, 600), (800, 1_000)], 0.5);
    let pipeline = energy_pipeline(PipelineConfig::default());

    let alignment = pipeline.align(&user, &reference).unwrap();
    assert_eq!(alignment.report.source_words, 2);
    assert_eq!(alignment.report.target_words, 1);
    assert!(!alignment.report.counts_match());
    assert_eq!(alignment.output.frames(), 3_200);
    assert_eq!(pipeline.diagnostics().count_mismatches, 1);
}

#[test]
fn silent_audio_gives_empty_output() {
    let silence = AudioClip::silence(RATE, 1, RATE as usize).unwrap();
    let out = energy_pipeline(PipelineConfig::default())
        .inference(&silence, &silence)
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn empty_audio_gives_empty_output() {
    let empty = AudioClip::empty(RATE, 1).unwrap();
    let (rate, pcm) = energy_pipeline(PipelineConfig::default())
        .inference_pcm16(&empty, &empty)
        .unwrap();
    assert_eq!(rate, RATE);
    assert!(pcm.is_empty());
}

#[test]
fn recognizer_init_failure_propagates() {
    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(BrokenFactory)).unwrap();
    let clip = bursts(500, &[(100, 300)], 0.5);
    assert!(matches!(
        pipeline.inference(&clip, &clip),
        Err(SingalongError::EngineInit(_))
    ));
}

#[test]
fn scripted_timeline_drives_segmentation() {
    // Same recording on both sides with the same timeline: every ratio is 1.
    let factory = ScriptedRecognizerFactory::from_spans(&[(0.06, 0.18), (0.18, 0.24), (0.24, 1.0)]);
    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(factory)).unwrap();
    let clip = bursts(1_000, &[(0, 1_000)], 0.3);

    let alignment = pipeline.align(&clip, &clip).unwrap();
    let frames: Vec<usize> = alignment.report.words.iter().map(|w| w.output_frames).collect();
    assert_eq!(frames, vec![1_920, 960, 12_160]);
    // Words cover everything after the 0.06 s lead-in.
    assert_eq!(alignment.output.frames() + 960, clip.frames());
}

#[test]
fn loud_output_saturates_or_rejects() {
    let factory = ScriptedRecognizerFactory::from_spans(&[(0.0, 0.5)]);
    let clip = bursts(500, &[(0, 500)], 1.5);

    let saturate = Pipeline::new(PipelineConfig::default(), Arc::new(factory.clone())).unwrap();
    let (_, pcm) = saturate.inference_pcm16(&clip, &clip).unwrap();
    assert!(pcm.iter().any(|&s| s == i16::MAX));

    let config = PipelineConfig {
        overflow: OverflowPolicy::Reject,
        ..Default::default()
    };
    let reject = Pipeline::new(config, Arc::new(factory)).unwrap();
    assert!(matches!(
        reject.inference_pcm16(&clip, &clip),
        Err(SingalongError::NumericOverflow { .. })
    ));
}

#[test]
fn aligned_output_survives_a_wav_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let user_path = dir.path().join("user.wav");
    let reference_path = dir.path().join("reference.wav");
    let out_path = dir.path().join("out/aligned.wav");

    write_wav(
        &user_path,
        &bursts(1_100, &[(100, 300), (700, 1_000)], 0.5),
        OverflowPolicy::Saturate,
    )
    .unwrap();
    write_wav(
        &reference_path,
        &bursts(1_100, &[(200, 600), (800, 1_000)], 0.5),
        OverflowPolicy::Saturate,
    )
    .unwrap();

    let user = read_wav(&user_path).unwrap();
    let reference = read_wav(&reference_path).unwrap();
    let out = energy_pipeline(PipelineConfig::default())
        .inference(&user, &reference)
        .unwrap();
    write_wav(&out_path, &out, OverflowPolicy::Saturate).unwrap();

    let reread = read_wav(&out_path).unwrap();
    assert_eq!(reread.frames(), 8_000);
    assert_eq!(reread.sample_rate(), RATE);
}
