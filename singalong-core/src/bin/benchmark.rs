//! Phase vocoder timing benchmark.
//!
//! Stretches one clip (a WAV file, or a synthetic tone) by a set of ratios
//! and reports latency percentiles and real-time factor per ratio as JSON.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use singalong_core::audio::{read_wav, AudioClip};
use singalong_core::stretch::phase_vocoder::DEFAULT_WINDOW_SIZE;
use singalong_core::{PhaseVocoder, TimeStretcher};

#[derive(Debug)]
struct Args {
    input: Option<PathBuf>,
    ratios: Vec<f64>,
    iterations: usize,
    window: usize,
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct CaseResult {
    ratio: f64,
    iteration: usize,
    latency_ms: f64,
    output_frames: usize,
}

#[derive(Debug, Clone, Serialize)]
struct RatioSummary {
    ratio: f64,
    runs: usize,
    p50_latency_ms: f64,
    p95_latency_ms: f64,
    avg_latency_ms: f64,
    /// Seconds of output produced per second of wall time.
    realtime_factor: f64,
}

#[derive(Debug, Clone, Serialize)]
struct Summary {
    input: String,
    sample_rate: u32,
    channels: u16,
    input_secs: f64,
    window_size: usize,
    iterations: usize,
    total_runs: usize,
    p50_latency_ms: f64,
    p95_latency_ms: f64,
    ratios: Vec<RatioSummary>,
    cases: Vec<CaseResult>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("benchmark failed: {e}");
        std::process::exit(1);
    }
}

fn parse_args() -> Result<Args, String> {
    let mut input: Option<PathBuf> = None;
    let mut ratios = vec![0.5, 0.8, 1.0, 1.25, 2.0];
    let mut iterations: usize = 3;
    let mut window = DEFAULT_WINDOW_SIZE;
    let mut output: Option<PathBuf> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--input" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --input".into());
                };
                input = Some(PathBuf::from(v));
            }
            "--ratios" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --ratios".into());
                };
                ratios = v
                    .split(',')
                    .map(|r| r.trim().parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| "invalid value for --ratios".to_string())?;
            }
            "--iterations" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --iterations".into());
                };
                iterations = v
                    .parse::<usize>()
                    .map_err(|_| "invalid value for --iterations".to_string())?
                    .clamp(1, 50);
            }
            "--window" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --window".into());
                };
                window = v
                    .parse::<usize>()
                    .map_err(|_| "invalid value for --window".to_string())?;
            }
            "--output" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --output".into());
                };
                output = Some(PathBuf::from(v));
            }
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run -p singalong-core --release --bin benchmark -- \\
  [--input <file.wav>] [--ratios 0.5,1.0,2.0] [--iterations <n>] [--window <n>] [--output <file.json>]"
                );
                std::process::exit(0);
            }
            other => {
                return Err(format!("unknown argument: {other}"));
            }
        }
    }

    Ok(Args {
        input,
        ratios,
        iterations,
        window,
        output,
    })
}

/// Five seconds of a 440 Hz tone with a slow tremolo at 44.1 kHz.
fn synthetic_clip() -> Result<AudioClip, String> {
    let rate = 44_100u32;
    let samples = (0..rate as usize * 5)
        .map(|i| {
            let t = i as f32 / rate as f32;
            let env = 0.6 + 0.4 * (2.0 * std::f32::consts::PI * 2.0 * t).sin();
            0.5 * env * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();
    AudioClip::mono(rate, samples).map_err(|e| e.to_string())
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let idx = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn summarize(ratio: f64, rows: &[&CaseResult], sample_rate: u32) -> RatioSummary {
    let latencies = rows.iter().map(|r| r.latency_ms).collect::<Vec<_>>();
    let total_ms: f64 = latencies.iter().sum();
    let produced_secs: f64 = rows
        .iter()
        .map(|r| r.output_frames as f64 / f64::from(sample_rate))
        .sum();
    RatioSummary {
        ratio,
        runs: rows.len(),
        p50_latency_ms: percentile(&latencies, 0.50),
        p95_latency_ms: percentile(&latencies, 0.95),
        avg_latency_ms: if latencies.is_empty() {
            0.0
        } else {
            total_ms / latencies.len() as f64
        },
        realtime_factor: if total_ms > 0.0 {
            produced_secs / (total_ms / 1000.0)
        } else {
            0.0
        },
    }
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    let (clip, input) = match &args.input {
        Some(path) => (
            read_wav(path).map_err(|e| format!("{}: {e}", path.display()))?,
            path.display().to_string(),
        ),
        None => (synthetic_clip()?, "synthetic:440Hz".to_string()),
    };
    let vocoder = PhaseVocoder::new(args.window).map_err(|e| e.to_string())?;

    println!(
        "Running phase vocoder benchmark on {input} ({:.2}s, {} ratios, iterations={})",
        clip.duration_secs(),
        args.ratios.len(),
        args.iterations
    );

    let mut cases = Vec::new();
    for &ratio in &args.ratios {
        for iteration in 1..=args.iterations {
            let started = Instant::now();
            let out = vocoder
                .stretch(clip.view(), ratio)
                .map_err(|e| format!("ratio {ratio}: {e}"))?;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
            cases.push(CaseResult {
                ratio,
                iteration,
                latency_ms,
                output_frames: out.frames(),
            });
            println!(
                "ratio {ratio} [{iteration}/{iters}] {latency:.1} ms",
                iters = args.iterations,
                latency = latency_ms
            );
        }
    }

    let ratios = args
        .ratios
        .iter()
        .map(|&ratio| {
            let rows = cases.iter().filter(|c| c.ratio == ratio).collect::<Vec<_>>();
            summarize(ratio, &rows, clip.sample_rate())
        })
        .collect();
    let all_latencies = cases.iter().map(|r| r.latency_ms).collect::<Vec<_>>();
    let summary = Summary {
        input,
        sample_rate: clip.sample_rate(),
        channels: clip.channels(),
        input_secs: clip.duration_secs(),
        window_size: vocoder.window_size(),
        iterations: args.iterations,
        total_runs: cases.len(),
        p50_latency_ms: percentile(&all_latencies, 0.50),
        p95_latency_ms: percentile(&all_latencies, 0.95),
        ratios,
        cases,
    };

    println!(
        "Done. runs={} p50={:.1}ms p95={:.1}ms",
        summary.total_runs, summary.p50_latency_ms, summary.p95_latency_ms
    );

    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    if let Some(out) = args.output {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&out, json).map_err(|e| e.to_string())?;
        println!("Wrote benchmark report: {}", out.display());
    } else {
        println!("{json}");
    }

    Ok(())
}
