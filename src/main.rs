//! Command-line entry point: evaluate one recording against a target phrase.
//!
//! # Startup sequence
//!
//! 1. Initialise logging and the TLS crypto provider.
//! 2. Load [`AppConfig`] (settings file or `--config`, then `XFYUN_*` env).
//! 3. Load the audio file and run the pre-flight quality check.
//! 4. Run [`Evaluator::evaluate`]; Ctrl-C disposes the evaluator.
//! 5. Print the score report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use twister_eval::{
    audio::{load_audio_file, AudioQuality},
    config::{AppConfig, AppPaths, RetryPolicy},
    scoring::{Dimension, Grade},
    Evaluator, ScoreResult,
};

/// Pronunciation scoring for tongue twisters
#[derive(Parser, Debug)]
#[clap(name = "twister-eval")]
#[clap(about = "Score a recording of a phrase with the remote evaluation engine")]
struct Args {
    /// Phrase the speaker was asked to read
    text: Option<String>,

    /// WAV file, or raw 16 kHz / 16-bit / mono PCM
    #[clap(value_name = "AUDIO")]
    audio: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[clap(long, value_name = "FILE", env = "TWISTER_EVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Stream audio even when the quality check fails
    #[clap(long)]
    skip_quality: bool,

    /// Stop retrying on errors that cannot change (auth, rejection)
    #[clap(long)]
    hardened: bool,

    /// Write a settings file with defaults and exit
    #[clap(long)]
    init_config: bool,
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => AppConfig::load()?,
    };
    if args.config.is_some() {
        config.apply_overrides(|key| std::env::var(key).ok());
    }
    if args.hardened {
        config.session.retry_policy = RetryPolicy::Hardened;
    }
    Ok(config)
}

fn print_report(result: &ScoreResult) {
    let grade = Grade::from_score(result.overall.value());
    println!("Overall: {}  ({grade})", result.overall);

    for dim in Dimension::ALL.iter().skip(1) {
        let score = result.get(*dim);
        if score.is_found() {
            println!("  {:<14} {score}", dim.label());
        }
    }

    if result.rejected {
        println!(
            "Rejected by engine: {}",
            result.reject_reason.as_deref().unwrap_or("no reason given")
        );
    }

    if !result.word_details.is_empty() {
        println!("Words:");
        for word in &result.word_details {
            println!(
                "  {} [{}] {} ms",
                word.content, word.symbol, word.duration_ms
            );
            for phone in word.phone_errors.errors() {
                println!("      {} ({})", phone.content, phone.severity());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // TLS crypto provider for wss:// connections
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install the TLS crypto provider"))?;

    let args = Args::parse();

    if args.init_config {
        let path = args
            .config
            .clone()
            .unwrap_or_else(|| AppPaths::new().settings_file);
        AppConfig::default().save_to(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    // 2. Configuration
    let config = load_config(&args)?;
    if !config.credentials.is_configured() {
        bail!(
            "credentials are not configured; set XFYUN_APPID, XFYUN_API_KEY and \
             XFYUN_API_SECRET or edit the settings file (--init-config)"
        );
    }

    let (Some(text), Some(audio_path)) = (args.text.as_deref(), args.audio.as_deref()) else {
        bail!("usage: twister-eval <TEXT> <AUDIO>");
    };

    // 3. Audio
    let pcm = load_audio_file(audio_path)
        .with_context(|| format!("cannot load {}", audio_path.display()))?;

    let quality = AudioQuality::new(
        config.audio.min_recording_secs,
        config.audio.max_recording_secs,
    );
    match quality.validate(&pcm) {
        Ok(report) => log::info!(
            "audio: {:.2}s, RMS {:.0}, {:.0}% silence",
            report.duration_secs,
            report.rms,
            report.silence_ratio * 100.0
        ),
        Err(e) if args.skip_quality => log::warn!("audio: {e} (continuing)"),
        Err(e) => bail!("audio check failed: {e} (use --skip-quality to send anyway)"),
    }

    // 4. Evaluate
    let evaluator = Arc::new(Evaluator::with_websocket(config));
    let on_interrupt = {
        let evaluator = Arc::clone(&evaluator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                evaluator.dispose();
            }
        })
    };

    let outcome = evaluator.evaluate(text, &pcm).await;
    on_interrupt.abort();

    // 5. Report
    let result = outcome.context("evaluation failed")?;
    print_report(&result);
    Ok(())
}
