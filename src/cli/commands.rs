use crate::cli::args::{Args, Command, ConfigCommand, EmulateArgs};
use crate::cli::output::{ConsoleWriter, ExchangeReport, OutputWriter};
use crate::core::client::CommandClient;
use crate::domain::command::{Command as DeviceLine, DeviceCommand};
use crate::domain::config::{DevCmdConfig, DeviceAddress, GlobalConfig, TargetConfig, DEFAULT_DEVICE_PORT};
use crate::domain::error::{DevCmdError, DevCmdResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::tcp::{DeviceEmulator, DeviceState};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Execute CLI command
pub async fn execute_command(args: Args) -> DevCmdResult<()> {
    let writer = ConsoleWriter::new(args.output.clone());

    let config_manager = ConfigManager::new()?;
    let loaded = match &args.config {
        Some(config_path) => config_manager.load_config_from_path(config_path.as_ref()),
        None => config_manager.load_config(),
    };

    if !args.quiet {
        let log_level = match &loaded {
            Ok(config) => config.global.log_level.clone(),
            Err(_) => GlobalConfig::default().log_level,
        };
        init_logging(&log_level, args.verbose)?;
    }

    let config = match loaded {
        Ok(config) => config,
        Err(e) if !requires_registry(&args) => {
            warn!("Ignoring configuration: {}", e);
            DevCmdConfig::default()
        }
        Err(e) => return Err(e),
    };

    match &args.command {
        Command::Send { command } => {
            let target = resolve_target(&args, &config)?;
            execute_exchange(&writer, target, DeviceLine::new(command.as_str())).await
        }
        Command::Pulses => {
            let target = resolve_target(&args, &config)?;
            execute_exchange(&writer, target, DeviceCommand::PulseCount.into()).await
        }
        Command::Door => {
            let target = resolve_target(&args, &config)?;
            execute_exchange(&writer, target, DeviceCommand::ToggleDoor.into()).await
        }
        Command::Emulate(emulate_args) => {
            let port = args.port.unwrap_or(DEFAULT_DEVICE_PORT);
            execute_emulate(emulate_args, port, &writer).await
        }
        Command::Config(config_args) => {
            execute_config_command(&config_args.command, &writer, &config, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!("devcmd {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Whether the command cannot run without the loaded device registry.
/// Everything else falls back to defaults when the configuration is broken.
pub fn requires_registry(args: &Args) -> bool {
    match &args.command {
        Command::Send { .. } | Command::Pulses | Command::Door => args.host.is_none(),
        Command::Config(config_args) => matches!(
            config_args.command,
            ConfigCommand::Show | ConfigCommand::Devices | ConfigCommand::Validate { file: None }
        ),
        Command::Emulate(_) | Command::Version => false,
    }
}

/// Work out which device to talk to. `--host` bypasses the configuration;
/// otherwise the named, default or only configured device is used. Port and
/// timeout flags override the configured values either way.
pub fn resolve_target(args: &Args, config: &DevCmdConfig) -> DevCmdResult<TargetConfig> {
    let mut target = match &args.host {
        Some(host) => TargetConfig::new(DeviceAddress::new(
            host.clone(),
            args.port.unwrap_or(DEFAULT_DEVICE_PORT),
        )),
        None => {
            let device = config.resolve_device(args.device.as_deref()).map_err(|e| match e {
                DevCmdError::Config { message } if args.device.is_none() => DevCmdError::InvalidInput(message),
                other => other,
            })?;
            TargetConfig::from(device)
        }
    };

    if let Some(port) = args.port {
        target.address.port = port;
    }
    if let Some(ms) = args.connect_timeout {
        target.connect_timeout = Some(Duration::from_millis(ms));
    }
    if let Some(ms) = args.read_timeout {
        target.read_timeout = Some(Duration::from_millis(ms));
    }

    Ok(target)
}

async fn execute_exchange(
    writer: &ConsoleWriter,
    target: TargetConfig,
    command: DeviceLine,
) -> DevCmdResult<()> {
    let device = target.address.to_string();
    let command_text = command.as_str().to_string();
    let pulses_per_kwh = target.pulses_per_kwh;

    // The client blocks for the whole exchange; keep it off the runtime threads
    let response = tokio::task::spawn_blocking(move || CommandClient::from_target(&target).send(&command))
        .await
        .map_err(|e| DevCmdError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

    let energy_kwh = match command_text.parse::<DeviceCommand>() {
        Ok(DeviceCommand::PulseCount) => response.energy_kwh(pulses_per_kwh),
        _ => None,
    };

    writer.write_response(&ExchangeReport {
        device,
        command: command_text,
        response: response.into_string(),
        energy_kwh,
    })?;
    Ok(())
}

async fn execute_emulate(args: &EmulateArgs, port: u16, writer: &ConsoleWriter) -> DevCmdResult<()> {
    let bind_addr = format!("{}:{}", args.bind, port);
    let mut emulator = DeviceEmulator::with_state(&bind_addr, DeviceState::with_pulse_count(args.pulses)).await?;
    emulator.start().await?;

    writer.write_message(&format!(
        "Device emulator listening on {} (Ctrl-C to stop)",
        emulator.get_bind_addr()
    ))?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received");

    let state = emulator.snapshot().await;
    emulator.stop().await?;

    writer.write_message(&format!(
        "Served {} connections, door pressed {} times",
        state.connections, state.door_presses
    ))?;
    Ok(())
}

fn execute_config_command(
    command: &ConfigCommand,
    writer: &ConsoleWriter,
    config: &DevCmdConfig,
    config_manager: &ConfigManager,
) -> DevCmdResult<()> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            let loaded = match file {
                Some(config_path) => config_manager.load_config_from_path(config_path.as_ref())?,
                None => config.clone(),
            };
            loaded.validate()?;

            writer.write_message(&format!("Configuration is valid ({} devices)", loaded.devices.len()))?;
            Ok(())
        }
        ConfigCommand::Init { path, global } => {
            if *global {
                let global_path = config_manager.get_global_config_path_ref();
                if global_path.exists() {
                    return Err(DevCmdError::Config {
                        message: format!("Global configuration already exists at {}", global_path.display()),
                    });
                }
                config_manager.save_config_to_path(global_path, &DevCmdConfig::default())?;
                writer.write_message(&format!("Global configuration initialized at '{}'", global_path.display()))?;
            } else {
                let base: PathBuf = match path {
                    Some(path) => path.into(),
                    None => std::env::current_dir()?,
                };
                let created = config_manager.init_project_config(&base)?;
                writer.write_message(&format!("Project configuration initialized at '{}'", created.display()))?;
            }
            Ok(())
        }
        ConfigCommand::Devices => {
            writer.write_devices(&config.devices)?;
            Ok(())
        }
    }
}
