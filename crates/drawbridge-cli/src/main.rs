use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use drawbridge_core::config::BridgeConfig;
use drawbridge_host::{
    pickers::{DirectorySaveRequester, StaticOpenRequester},
    BindingRegistry, DocumentEvents, DocumentWatcher, EditorBinding, FileDocument, HostDocument,
    ImportCommand,
};
use drawbridge_sync::channel::channel_pair;
use drawbridge_sync::collab::{Collaborators, Notifier, OpenRequester, TracingNotifier};
use drawbridge_sync::instance::SyncInstance;
use drawbridge_sync::relay::Relay;

#[derive(Parser)]
#[command(
    name = "drawbridge",
    about = "Keeps a scene document and an embedded drawing surface in sync",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the surface and keep a scene document synchronized with it
    Serve {
        /// The scene document to edit
        file: PathBuf,

        /// Port for the surface asset server (default: ephemeral)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show bridge status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(BridgeConfig::config_dir);

    let config = BridgeConfig::load(&config_path)?;

    // Initialize logging
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Serve { file, port } => {
            serve(config, file, port).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
        },
        Commands::Status => {
            println!("drawbridge v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!("Export dir: {}", config.export_dir().display());
            println!("Import command: {}", config.import_command());
        }
    }

    Ok(())
}

async fn serve(config: BridgeConfig, file: PathBuf, port: Option<u16>) -> anyhow::Result<()> {
    let registry = Arc::new(BindingRegistry::new());
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let opener: Arc<dyn OpenRequester> =
        Arc::new(StaticOpenRequester::new(config.library_path()));

    let collab = Collaborators {
        commands: Arc::new(ImportCommand {
            registry: registry.clone(),
            opener,
            notifier: notifier.clone(),
            command: config.import_command(),
            extension: config.library_extension(),
        }),
        save_dialog: Arc::new(DirectorySaveRequester::new(config.export_dir())),
        notifier,
    };

    let events = Arc::new(DocumentEvents::new());
    let document = FileDocument::open(&file, events.clone()).await?;
    let _watcher = DocumentWatcher::start(document.clone())?;

    // controller <-> relay <-> websocket leg
    let (controller_end, relay_inner) = channel_pair();
    let (relay_outer, ws_end) = channel_pair();
    let relay = Relay::spawn(relay_inner, relay_outer)?;

    let instance = SyncInstance::start(controller_end, collab, config.import_command())?;
    let binding = EditorBinding::bind(instance, document.clone(), events);
    registry.register(binding).await;

    let port = port.unwrap_or_else(|| config.server_port());
    let (addr, server) = drawbridge_web::start_surface_server(&config.bind(), port, ws_end).await?;

    info!(document = %file.display(), "bridge running");
    info!("Open http://{addr}/ for the surface, http://{addr}/embed for the framed view");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    registry.close(document.id()).await;
    relay.stop();
    server.abort();
    Ok(())
}
