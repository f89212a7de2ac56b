//! thread-narrator: voices a discussion thread into mp3 clips.

mod config;
mod narration;
mod text;
mod thread;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use narration::assembler::AudioAssembler;
use narration::duration::SymphoniaProbe;
use narration::grammar::GrammarSmoother;
use narration::media::Ffmpeg;
use narration::pipeline::{NarrationPipeline, PipelineSettings};
use narration::prepare::TextPreparer;
use narration::rate_limit::SystemClock;
use narration::streamlabs::StreamlabsPolly;

#[derive(Parser, Debug)]
#[command(name = "thread-narrator", about = "Voice a discussion thread into audio clips")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Thread JSON file to narrate
    #[arg(short, long)]
    thread: PathBuf,

    /// Output root, overrides narration.output_dir
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug,reqwest=info,hyper=info,symphonia=info")
    } else {
        EnvFilter::new("info,reqwest=warn,hyper=warn,symphonia=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("thread-narrator starting");

    let config = config::Config::load(args.config.as_deref());
    info!("Config loaded: {:?}", config.narration);

    let thread = thread::Thread::load(&args.thread)?;
    info!(
        "Thread {} loaded: {} comments",
        thread.thread_id,
        thread.comments.len()
    );

    if config.tts.voice_choice.to_lowercase() != "streamlabspolly" {
        warn!(
            "Voice backend '{}' is not supported, using streamlabspolly",
            config.tts.voice_choice
        );
    }
    let backend = Arc::new(StreamlabsPolly::new(&config.tts, Arc::new(SystemClock))?);

    let smoother = if config.ai.grammar_fix {
        info!("Grammar smoothing enabled (model: {})", config.ai.model);
        Some(GrammarSmoother::new(&config.ai)?)
    } else {
        None
    };
    let preparer = TextPreparer::new(
        text::TextCleaner::new(&config.text, config.tts.no_emojis),
        smoother,
    );

    let pipeline = NarrationPipeline::new(
        backend.clone(),
        AudioAssembler::new(Arc::new(Ffmpeg::new(&config.media.ffmpeg))),
        Arc::new(SymphoniaProbe),
        preparer,
        PipelineSettings::from_config(&config),
    );

    let output_root = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.narration.output_dir));
    let target = thread.target_directory(&output_root);

    let outcome = pipeline.run(&thread, &target).await?;

    let limiter = backend.limiter();
    if limiter.retries() > 0 {
        info!(
            "Rate limited {} times, waited {:.1}s in total (longest {:.1}s)",
            limiter.retries(),
            limiter.total_waited().as_secs_f64(),
            limiter.max_wait().as_secs_f64()
        );
    }

    println!(
        "narrated {} items up to ordinal {}, {:.2}s{}",
        outcome.accepted,
        outcome.highest_ordinal,
        outcome.accumulated_duration,
        if outcome.stopped_early { " (stopped at ceiling)" } else { "" }
    );

    Ok(())
}
