//! quilt CLI: multi-pane chat client

use clap::{Parser, Subcommand};
use quilt_engine::{ChatStore, ConfigSet};
use std::path::{Path, PathBuf};

/// Multi-pane chat client with a TUI
#[derive(Parser)]
#[command(name = "quilt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory holding conversations and configurations
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the TUI (default when no command specified)
    Tui,

    /// Initialize the data directory and seed default configurations
    Init,

    /// List named configurations
    Configs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored conversations
    Conversations {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

const DEFAULT_DATA_DIR: &str = ".quilt";

fn main() {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Tui) => {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
            if let Err(e) = rt.block_on(quilt_tui::run_tui(&cli.data_dir)) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Init) => {
            cmd_init(&cli.data_dir);
        }
        Some(Commands::Configs { json }) => {
            cmd_configs(&cli.data_dir, json);
        }
        Some(Commands::Conversations { json }) => {
            cmd_conversations(&cli.data_dir, json);
        }
    }
}

fn cmd_init(data_dir: &Path) {
    let conversations_dir = data_dir.join("conversations");
    if let Err(e) = std::fs::create_dir_all(&conversations_dir) {
        eprintln!("Failed to create {}: {e}", conversations_dir.display());
        std::process::exit(1);
    }

    let configs_path = data_dir.join("configs.json");
    if configs_path.exists() {
        println!("Configurations already exist at {}", configs_path.display());
    } else {
        match ConfigSet::seeded().save(&configs_path) {
            Ok(()) => println!("Created {}", configs_path.display()),
            Err(e) => {
                eprintln!("Failed to write configurations: {e}");
                std::process::exit(1);
            }
        }
    }

    println!("\nInitialization complete!");
    println!("Run `quilt` to open the client");
}

fn cmd_configs(data_dir: &Path, json: bool) {
    let store = open_store(data_dir);
    let configs = store.configs();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&configs).expect("failed to serialize")
        );
        return;
    }

    if configs.is_empty() {
        println!("No configurations. Run `quilt init` to seed defaults.");
        return;
    }

    println!("Named configurations\n");
    for config in &configs {
        println!("  {} - {}", config.id, config.title);
    }
}

fn cmd_conversations(data_dir: &Path, json: bool) {
    let store = open_store(data_dir);
    let records = store.conversations();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).expect("failed to serialize")
        );
        return;
    }

    if records.is_empty() {
        println!("No conversations yet.");
        return;
    }

    println!("Conversations\n");
    for record in &records {
        println!(
            "  {} - {} (updated {})",
            record.id,
            record.display_title(),
            record.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn open_store(data_dir: &Path) -> ChatStore {
    match ChatStore::open(data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open data directory: {e}");
            std::process::exit(1);
        }
    }
}
