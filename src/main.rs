mod cache;
mod producer;
mod session;
mod storage;
mod web;

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::storage::{export_dataset, DatasetStore};
use crate::web::Config;

#[derive(Parser)]
#[command(name = "fieldlog")]
#[command(about = "Location and motion sensor recorder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the recorder and its control API
    Serve {
        #[arg(short, long, default_value = "fieldlog.yaml")]
        config: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long, default_value = "fieldlog.yaml")]
        config: String,
    },
    /// Print the stored dataset
    Dump {
        #[arg(short, long, default_value = "fieldlog.yaml")]
        config: String,
        /// Print the raw JSON document instead of a summary
        #[arg(long)]
        raw: bool,
    },
    /// Clear the stored dataset (stop `serve` first)
    ///
    /// This writes the dataset file directly. A running `serve` does not see the reset: its
    /// recording is not rejected, and an append already in progress can write the old records
    /// back. Use `DELETE /api/dataset` while the service is up.
    Reset {
        #[arg(short, long, default_value = "fieldlog.yaml")]
        config: String,
    },
    /// Share the stored dataset, or write it to a file
    Export {
        #[arg(short, long, default_value = "fieldlog.yaml")]
        config: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(&config),
        Commands::Validate { config } => validate(&config),
        Commands::Dump { config, raw } => dump(&config, raw),
        Commands::Reset { config } => reset(&config),
        Commands::Export { config, out } => export(&config, out),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading {}: {}", path, e);
            None
        }
    }
}

fn serve(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    println!("Configuration is valid");
    match &config.device.id {
        Some(id) => println!("  device:   {}", id),
        None => println!("  device:   generated, stored in {}", config.storage.base_folder.display()),
    }
    println!("  storage:  {}", config.storage.base_folder.display());
    println!("  period:   {:?}", config.sampling.period);
    println!("  source:   {:?}", config.source);
    println!(
        "  location: {} ({:?}, {:?} / {} m)",
        if config.location.enabled { "enabled" } else { "denied" },
        config.location.accuracy,
        config.location.time_interval,
        config.location.distance_interval_m
    );
    println!(
        "  motion:   {} every {:?}",
        config.motion.channels.join(", "),
        config.motion.update_interval
    );
    match &config.export.outbox {
        Some(dir) => println!("  export:   {}", dir.display()),
        None => println!("  export:   unavailable"),
    }
    ExitCode::SUCCESS
}

fn open_store(path: &str) -> Option<(DatasetStore, storage::DeviceId, Config)> {
    let config = load_config(path)?;
    let device = match config.device_id() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error resolving device id: {}", e);
            return None;
        }
    };
    let store = DatasetStore::new(config.storage.base_folder.clone());
    Some((store, device, config))
}

fn dump(path: &str, raw: bool) -> ExitCode {
    let Some((store, device, _)) = open_store(path) else {
        return ExitCode::FAILURE;
    };

    if raw {
        return match store.export_bytes(&device) {
            Ok(bytes) => {
                println!("{}", String::from_utf8_lossy(&bytes));
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to read data: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let records = match store.read_all(&device) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to read data: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{} records for {} ({})",
        records.len(),
        device,
        store.dataset_path(&device).display()
    );
    for (i, record) in records.iter().enumerate() {
        let location = match &record.location {
            Some(l) => format!("{:.6}, {:.6}", l.latitude, l.longitude),
            None => "no fix".to_string(),
        };
        let channels: Vec<&str> = record.sensor_data.keys().map(String::as_str).collect();
        println!(
            "  {}: {} {} [{}] {}",
            i + 1,
            record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            record.activity_type,
            location,
            channels.join(",")
        );
    }
    ExitCode::SUCCESS
}

fn reset(path: &str) -> ExitCode {
    let Some((store, device, _)) = open_store(path) else {
        return ExitCode::FAILURE;
    };

    match store.reset(&device) {
        Ok(()) => {
            println!("Dataset for {} cleared", device);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to clear dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn export(path: &str, out: Option<PathBuf>) -> ExitCode {
    let Some((store, device, config)) = open_store(path) else {
        return ExitCode::FAILURE;
    };

    let result = match out {
        Some(out) => store
            .export_bytes(&device)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                fs::write(&out, &bytes).map_err(|e| e.to_string())?;
                Ok(format!("{} bytes written to {}", bytes.len(), out.display()))
            }),
        None => export_dataset(&store, &device, config.export.share_target().as_ref())
            .map(|receipt| format!("{} bytes shared to {}", receipt.bytes, receipt.destination))
            .map_err(|e| e.to_string()),
    };

    match result {
        Ok(message) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Export failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
