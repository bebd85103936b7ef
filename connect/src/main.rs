//! Alamira Connect - Entry Point
//!
//! Onboards Alamira displays from a scanned QR payload: identifies the device
//! over its access point, hands it WiFi credentials, verifies it on the target
//! network and records it as a paired device.

use std::env;
use std::process::ExitCode;

use alamira_connect::app::options::AppOptions;
use alamira_connect::app::run::{run, Command};
use alamira_connect::app::state::AppState;
use alamira_connect::logs::{init_logging, LogLevel, LogOptions};
use alamira_connect::storage::layout::StorageLayout;
use alamira_connect::storage::settings::Settings;
use alamira_connect::utils::{parse_cli_args, version_info};

use tracing::{debug, error};

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = parse_cli_args(env::args().skip(1));

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let layout = StorageLayout::default();
    let settings = match Settings::load(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_level = match cli_args.get("log-level") {
        Some(level) => match level.parse::<LogLevel>() {
            Ok(level) => level,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => settings.log_level.clone(),
    };
    let log_options = LogOptions {
        log_level,
        json_format: settings.json_logs,
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = match AppOptions::from_settings(layout, &settings).apply_cli_overrides(&cli_args) {
        Ok(options) => options,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("Running Alamira Connect with options: {:?}", options);

    let command = match Command::from_args(&cli_args) {
        Ok(command) => command,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::init(&options).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&state, command).await {
        Ok(output) => {
            match serde_json::to_string_pretty(&output) {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    error!("{e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
