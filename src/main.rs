// ABOUTME: Main entry point for the podterm command-line client
// Parses flags, loads config, and runs one pod terminal session in raw mode

use anyhow::{bail, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use podterm::app::Runner;
use podterm::config::Config;
use podterm::models::SelectionEvent;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "podterm", version, about = "Attach to pod logs and shells through the UI server")]
struct Args {
    /// Config file (defaults to ~/.config/podterm/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// API host, with optional port
    #[arg(long)]
    host: Option<String>,

    /// Kube context to pass to the server
    #[arg(long)]
    context: Option<String>,

    #[arg(short = 'n', long)]
    namespace: Option<String>,

    #[arg(long, conflicts_with = "image_selector")]
    pod: Option<String>,

    #[arg(short = 'c', long, requires = "pod")]
    container: Option<String>,

    /// Open a shell instead of following logs
    #[arg(long, requires = "pod")]
    interactive: bool,

    /// Merge logs of every container running this image; repeatable
    #[arg(long = "image-selector")]
    image_selector: Vec<String>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.api.host = host.clone();
        }
        if let Some(context) = &self.context {
            config.api.kube_context = Some(context.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.api.namespace = namespace.clone();
        }
    }

    fn selection(&self) -> SelectionEvent {
        SelectionEvent {
            pod: self.pod.clone(),
            container: self.container.clone(),
            interactive: Some(self.interactive),
            multiple: (!self.image_selector.is_empty()).then(|| self.image_selector.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging();
    setup_panic_handler();

    let path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&path)?;
    args.apply(&mut config);
    config.validate()?;

    let selection = args.selection();
    if selection.clone().into_key().is_none() {
        bail!("Pass --pod with -c, or at least one --image-selector");
    }

    let mut runner = Runner::new(&config)?;

    enable_raw_mode()?;
    let result = runner.run(selection).await;
    disable_raw_mode()?;

    result
}

fn setup_logging() {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    let log_dir = dirs::home_dir()
        .map(|home| home.join(".podterm").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".podterm/logs"));

    let _ = std::fs::create_dir_all(&log_dir);

    let log_file = log_dir.join(format!(
        "podterm-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    // stdout belongs to the session; never log there
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_file) else {
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podterm=info".into()),
        )
        .init();
}

fn setup_panic_handler() {
    use tracing::error;

    std::panic::set_hook(Box::new(|panic_info| {
        // restore the terminal before reporting
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stderr(), crossterm::cursor::Show);

        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
