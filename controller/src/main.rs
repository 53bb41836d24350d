//! Deployment controller - Entry Point
//!
//! Accepts IOC and display deployment requests over HTTP and runs them in
//! the background across facilities.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use deployctl::app::options::{resolve_logbook_credentials, AppOptions};
use deployctl::app::run::run;
use deployctl::errors::ControllerError;
use deployctl::filesys::dir::Dir;
use deployctl::filesys::file::File;
use deployctl::logs::{init_logging, LogOptions};
use deployctl::storage::layout::StorageLayout;
use deployctl::storage::settings::Settings;
use deployctl::utils::version_info;

use tracing::{error, info, warn};

const ENV_LOGBOOK_USERNAME: &str = "DEPLOYCTL_LOGBOOK_USERNAME";
const ENV_LOGBOOK_PASSWORD: &str = "DEPLOYCTL_LOGBOOK_PASSWORD";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };
    let settings_file = match cli_args.get("settings") {
        Some(path) => File::new(PathBuf::from(path)),
        None => layout.settings_file(),
    };

    // Retrieve the settings file
    let settings_found = settings_file.exists().await;
    let settings = match load_settings(&settings_file, settings_found).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!(
                "Unable to read settings file {}: {}",
                settings_file.path().display(),
                e
            );
            std::process::exit(1);
        }
    };

    // Initialize logging; the guard must outlive the controller
    let log_dir = match &settings.log_dir {
        Some(dir) => Dir::new(dir),
        None => layout.logs_dir(),
    };
    if let Err(e) = log_dir.create().await {
        eprintln!("Unable to create log directory {}: {}", log_dir.path().display(), e);
    }
    let log_options = LogOptions {
        log_level: settings.log_level,
        stdout: true,
        log_dir: Some(log_dir.path().to_path_buf()),
        json_format: settings.json_logs,
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    if !settings_found {
        warn!(
            "Settings file {} not found, using defaults",
            settings_file.path().display()
        );
    }

    // Credentials are read from the environment here and nowhere else
    let credentials = match resolve_logbook_credentials(
        &settings.logbook,
        env::var(ENV_LOGBOOK_USERNAME).ok(),
        env::var(ENV_LOGBOOK_PASSWORD).ok(),
    ) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Refusing to start: {}", e);
            error!(
                "Set logbook credentials in the settings file or via {} and {}",
                ENV_LOGBOOK_USERNAME, ENV_LOGBOOK_PASSWORD
            );
            std::process::exit(1);
        }
    };

    let options = match AppOptions::from_settings(&settings, layout, credentials) {
        Ok(options) => options,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        version = %version.version,
        production = settings.production,
        facilities = ?options.facilities,
        "Running deployment controller"
    );
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run the controller: {e}");
        std::process::exit(1);
    }
}

async fn load_settings(file: &File, found: bool) -> Result<Settings, ControllerError> {
    if !found {
        return Ok(Settings::default());
    }
    file.read_json::<Settings>().await
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Unable to install signal handlers, waiting for Ctrl+C only");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
