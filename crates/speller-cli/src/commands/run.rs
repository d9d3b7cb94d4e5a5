use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use speller_core::{
    Config, EventSink, HeadlessSurface, JsonLinesSink, Lifecycle, LifecycleKind, ModelMessage,
    Speller, TracingSink,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{watch, Notify};
use tracing_subscriber::EnvFilter;

use crate::render::TextGrid;

#[derive(Args)]
pub struct RunArgs {
    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
    /// Training targets, overriding the configured ones
    #[arg(long)]
    targets: Option<String>,
    /// Seed for reproducible flash groups and durations
    #[arg(long)]
    seed: Option<u64>,
    /// Draw the grid as text on stderr
    #[arg(long)]
    render: bool,
    /// Start testing right after training instead of waiting for the model
    #[arg(long)]
    skip_wait: bool,
    /// Log event labels to stderr instead of streaming events on stdout
    #[arg(long)]
    quiet: bool,
}

/// Log to stderr so stdout carries nothing but events.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session(config, args));
    // A blocked stdin read would otherwise hold the runtime open.
    runtime.shutdown_background();
    result
}

async fn session(config: Config, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let sink: Arc<dyn EventSink> = if args.quiet {
        Arc::new(TracingSink)
    } else {
        Arc::new(JsonLinesSink::new(std::io::stdout()))
    };
    let mut speller = if args.render {
        let grid = TextGrid::new(config.grid.clone(), std::io::stderr());
        Speller::new(&config, grid, sink)?
    } else {
        Speller::new(&config, HeadlessSurface, sink)?
    };

    let ready = Arc::new(Notify::new());
    {
        let ready = Arc::clone(&ready);
        speller.on(LifecycleKind::ModelReady, move |_| ready.notify_one());
    }
    speller.on(LifecycleKind::FocusBegins, |event| {
        if let Lifecycle::FocusBegins(symbol) = event {
            tracing::info!(%symbol, "focus on the target");
        }
    });
    speller.on(LifecycleKind::TrainingEnds, |_| {
        tracing::info!("training finished, waiting for the model");
    });
    let speller = Arc::new(speller);

    let (closed_tx, mut closed) = watch::channel(false);
    let closed_tx = Arc::new(closed_tx);
    tokio::spawn(read_messages(Arc::clone(&speller), Arc::clone(&closed_tx)));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted");
            closed_tx.send_replace(true);
        }
    });

    speller.attach().await?;
    speller.train(args.targets.as_deref()).await?;

    let mut proceed = !*closed.borrow();
    if proceed && !args.skip_wait {
        tokio::select! {
            () = ready.notified() => {}
            _ = closed.wait_for(|closed| *closed) => { proceed = false; }
        }
    }

    if proceed {
        tracing::info!("testing");
        let testing = speller.test();
        tokio::pin!(testing);
        let mut stopping = false;
        loop {
            tokio::select! {
                biased;
                result = &mut testing => {
                    result?;
                    break;
                }
                _ = closed.wait_for(|closed| *closed), if !stopping => {
                    stopping = true;
                    speller.stop();
                }
            }
        }
    }

    speller.dispose().await?;
    tracing::info!(spelled = %speller.spelled(), "session ended");
    Ok(())
}

/// Route every stdin line to the speller until EOF.
async fn read_messages(speller: Arc<Speller>, closed: Arc<watch::Sender<bool>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match ModelMessage::parse(&line) {
                Ok(message) => {
                    speller.handle_model_message(&message);
                    if matches!(message, ModelMessage::Predict { .. }) {
                        tracing::info!(spelled = %speller.spelled(), "prediction");
                    }
                }
                Err(e) => tracing::warn!("ignoring message: {e}"),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("stdin closed: {e}");
                break;
            }
        }
    }
    closed.send_replace(true);
}
