use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use sightline::settings::CaptureSettings;
use sightline::{
    person, ApiClient, CommandFrameSource, ConnectivityMonitor, DirectoryFrameSource, Domain,
    Feedback, FeedbackHandle, FrameSource, ScanController, SettingsStore,
};

#[derive(Parser)]
#[command(name = "sightline", version, about = "Voice-first scene narration client")]
struct Cli {
    /// Settings file; created with defaults on first run
    #[arg(long, env = "SIGHTLINE_CONFIG", default_value = "sightline.json")]
    config: PathBuf,

    /// Override the detection server base URL
    #[arg(long, env = "SIGHTLINE_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the detection server and report reachability
    Health,
    /// Narrate detections continuously (ctrl-c stops), or once with --once
    Scan {
        #[arg(value_enum)]
        domain: Domain,
        #[arg(long)]
        once: bool,
    },
    /// Register a person from face photos (at least 3)
    Enroll {
        name: String,
        #[arg(required = true, num_args = 1..)]
        images: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let store = SettingsStore::new(cli.config.clone())?;

    let mut api_settings = store.api();
    if let Some(url) = cli.api_url {
        api_settings.base_url = url;
    }

    let client = ApiClient::new(&api_settings);
    let connectivity = Arc::new(ConnectivityMonitor::new(client.clone()));
    let feedback = FeedbackHandle::new(store.speech());

    match cli.command {
        Command::Health => {
            let ok = connectivity.refresh().await;
            println!("{}", if ok { "connected" } else { "disconnected" });
            if !ok {
                std::process::exit(1);
            }
        }

        Command::Scan { domain, once } => {
            let frames = frame_source(&store.capture())?;
            let mut controller = ScanController::new(
                Arc::new(client),
                frames,
                Arc::new(feedback.clone()),
                Arc::clone(&connectivity),
                store.scan(),
            );

            feedback.speak(domain.intro(), true);

            if !connectivity.refresh().await {
                feedback.speak(
                    "Cannot connect to detection server. Check that it is running and the address is correct.",
                    true,
                );
                bail!(
                    "detection server is not reachable at {}",
                    api_settings.base_url
                );
            }

            if once {
                match controller.capture_once(domain).await? {
                    Some(announcement) => println!("{}", announcement.display_label),
                    None => println!("nothing detected"),
                }
            } else {
                controller.start(domain)?;
                tokio::signal::ctrl_c()
                    .await
                    .context("failed to listen for ctrl-c")?;
                info!("shutting down");
                controller.stop().await?;

                let snapshot = controller.metrics_snapshot().await;
                info!(
                    "session: {} cycles, {} announced, {} empty, {} failed",
                    snapshot.cycle_count,
                    snapshot.announced_count,
                    snapshot.no_detection_count,
                    snapshot.failure_count
                );
            }
        }

        Command::Enroll { name, images } => {
            let response = person::register_person(&client, &feedback, &name, &images).await?;
            if response.success {
                println!("registered {}", name.trim());
            } else {
                bail!(
                    "registration failed: {}",
                    response
                        .error
                        .or(response.message)
                        .unwrap_or_else(|| "unknown error".into())
                );
            }
        }
    }

    Ok(())
}

fn frame_source(capture: &CaptureSettings) -> Result<Arc<dyn FrameSource>> {
    if let Some(program) = &capture.program {
        return Ok(Arc::new(CommandFrameSource::new(
            program.clone(),
            capture.args.clone(),
        )));
    }
    if let Some(dir) = &capture.spool_dir {
        return Ok(Arc::new(DirectoryFrameSource::new(dir.clone())));
    }
    bail!("no capture source configured: set capture.program or capture.spool_dir in settings")
}
