use crate::domain::command::DeviceCommand;
use crate::domain::error::{DevCmdError, DevCmdResult};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Reply for any command the firmware does not recognise
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command";

/// Reply after the door relay has been pressed
pub const DOOR_TOGGLED_REPLY: &str = "Door toggled via relay";

/// How long the door relay stays energised after a press
pub const RELAY_ACTIVATION_TIME: Duration = Duration::from_millis(500);

/// How long a client may take to send its command line
const COMMAND_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest command line read before replying
const MAX_COMMAND_LINE: u64 = 1024;

/// Simulated firmware state: pulse counter and garage door relay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    pub pulse_count: u64,
    pub door_presses: u64,
    pub connections: u64,
    /// Every command line received, terminator stripped
    pub received: Vec<String>,
    /// When the relay was last energised
    pub relay_activated_at: Option<Instant>,
}

impl DeviceState {
    pub fn with_pulse_count(pulse_count: u64) -> Self {
        Self {
            pulse_count,
            ..Self::default()
        }
    }

    /// Produce the reply line (without terminator) for one command.
    pub fn handle_command(&mut self, line: &str) -> String {
        self.handle_command_at(line, Instant::now())
    }

    pub fn handle_command_at(&mut self, line: &str, now: Instant) -> String {
        self.received.push(line.to_string());

        match line.parse::<DeviceCommand>() {
            Ok(DeviceCommand::PulseCount) => self.pulse_count.to_string(),
            Ok(DeviceCommand::ToggleDoor) => {
                self.press_relay(now);
                DOOR_TOGGLED_REPLY.to_string()
            }
            Err(_) => UNKNOWN_COMMAND_REPLY.to_string(),
        }
    }

    /// Energise the relay; a press while active restarts the window.
    pub fn press_relay(&mut self, now: Instant) {
        self.door_presses += 1;
        self.relay_activated_at = Some(now);
        info!("Door relay pressed ({} total)", self.door_presses);
    }

    /// Whether the relay is still held at `now`.
    pub fn relay_active_at(&self, now: Instant) -> bool {
        self.relay_activated_at
            .map_or(false, |at| now.saturating_duration_since(at) <= RELAY_ACTIVATION_TIME)
    }
}

/// Read one command line, stopping after `MAX_COMMAND_LINE` bytes.
async fn read_command_line<R>(reader: &mut R, line: &mut String) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    reader.take(MAX_COMMAND_LINE).read_line(line).await
}

/// TCP server that answers the device protocol: one command line in,
/// one reply line out, then the connection is closed.
pub struct DeviceEmulator {
    listener: Option<TcpListener>,
    bind_addr: SocketAddr,
    state: Arc<Mutex<DeviceState>>,
    shutdown_sender: Option<mpsc::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DeviceEmulator {
    pub async fn new(bind_addr: &str) -> DevCmdResult<Self> {
        Self::with_state(bind_addr, DeviceState::default()).await
    }

    pub async fn with_state(bind_addr: &str, state: DeviceState) -> DevCmdResult<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| DevCmdError::Emulator {
            message: format!("Failed to bind to {}: {}", bind_addr, e),
        })?;

        let actual_addr = listener.local_addr().map_err(|e| DevCmdError::Emulator {
            message: format!("Failed to get local address: {}", e),
        })?;

        info!("Device emulator created on {}", actual_addr);

        Ok(Self {
            listener: Some(listener),
            bind_addr: actual_addr,
            state: Arc::new(Mutex::new(state)),
            shutdown_sender: None,
            server_handle: None,
        })
    }

    pub fn get_bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }

    pub async fn start(&mut self) -> DevCmdResult<()> {
        if self.server_handle.is_some() {
            return Err(DevCmdError::Emulator {
                message: "Emulator is already running".to_string(),
            });
        }

        let listener = self.listener.take().ok_or_else(|| DevCmdError::Emulator {
            message: "Emulator cannot be restarted after stop".to_string(),
        })?;

        info!("Starting device emulator on {}", self.bind_addr);

        let state = Arc::clone(&self.state);
        let (shutdown_sender, mut shutdown_receiver) = mpsc::channel::<()>(1);

        let server_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                debug!("Client connected: {}", addr);
                                let state = Arc::clone(&state);
                                tokio::spawn(async move {
                                    if let Err(e) = Self::handle_client(stream, addr, state).await {
                                        error!("Error handling client {}: {}", addr, e);
                                    }
                                    debug!("Client disconnected: {}", addr);
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {}", e);
                            }
                        }
                    }

                    _ = shutdown_receiver.recv() => {
                        info!("Received shutdown signal, stopping emulator");
                        break;
                    }
                }
            }
        });

        self.shutdown_sender = Some(shutdown_sender);
        self.server_handle = Some(server_handle);
        Ok(())
    }

    async fn handle_client(
        stream: TcpStream,
        addr: SocketAddr,
        state: Arc<Mutex<DeviceState>>,
    ) -> DevCmdResult<()> {
        state.lock().await.connections += 1;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        let n = tokio::time::timeout(COMMAND_READ_TIMEOUT, read_command_line(&mut reader, &mut line))
            .await
            .map_err(|_| DevCmdError::Emulator {
                message: format!("{} sent no command within {:?}", addr, COMMAND_READ_TIMEOUT),
            })??;

        if n == 0 {
            debug!("{} closed without sending a command", addr);
            return Ok(());
        }

        let command = line.trim_end_matches(['\r', '\n']);
        let reply = state.lock().await.handle_command(command);
        debug!("{} sent {:?}, replying {:?}", addr, command, reply);

        let mut stream = reader.into_inner();
        stream.write_all(format!("{}\n", reply).as_bytes()).await?;
        stream.flush().await?;
        stream.shutdown().await?;

        Ok(())
    }

    pub async fn stop(&mut self) -> DevCmdResult<()> {
        if let Some(handle) = self.server_handle.take() {
            info!("Stopping device emulator");

            if let Some(sender) = self.shutdown_sender.take() {
                if let Err(e) = sender.send(()).await {
                    warn!("Failed to send shutdown signal: {}", e);
                }
            }

            if let Err(e) = handle.await {
                warn!("Emulator task completed with error: {}", e);
            }

            info!("Device emulator stopped");
        }

        Ok(())
    }

    /// Copy of the current device state
    pub async fn snapshot(&self) -> DeviceState {
        self.state.lock().await.clone()
    }

    /// Simulate pulses arriving from the meter's LED sensor.
    pub async fn record_pulses(&self, pulses: u64) {
        self.state.lock().await.pulse_count += pulses;
    }
}

impl Drop for DeviceEmulator {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            warn!("DeviceEmulator dropped while still running; aborting accept loop");
            handle.abort();
        }
    }
}
