use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;

use crate::dispatch::Command;
use crate::logger;
use crate::protocol::{self, Request};

/// How long a fresh launch waits for a running peer to accept the probe.
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);
/// How long the listener waits for an accepted client to finish writing.
const RECV_TIMEOUT: Duration = Duration::from_secs(2);
/// How long shutdown waits for the listener task to wind down.
const LISTENER_JOIN_TIMEOUT: Duration = Duration::from_millis(1500);

/// Probes `addr` for a running instance. `Ok(true)` means the request was
/// delivered and this process must not become a server; `Ok(false)` means
/// nobody answered and the caller should bind. A connection that succeeds
/// but cannot carry the request is an error: a server exists, the request
/// is simply lost.
pub async fn probe_and_send(addr: SocketAddr, request: &Request) -> Result<bool> {
    let stream = match time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(_)) | Err(_) => return Ok(false),
    };
    protocol::write_request(stream, request)
        .await
        .context("a running instance answered but the request could not be delivered")?;
    Ok(true)
}

/// The server side of the fixed endpoint: the bound listener task, the
/// command-queue sender, and the shutdown flag, owned together so the
/// whole lifecycle is one value.
pub struct ServerInstance {
    local_addr: SocketAddr,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: watch::Sender<bool>,
    listener: JoinHandle<()>,
}

impl ServerInstance {
    /// Binds `addr` and starts accepting. A bind failure (the port is held
    /// by a live peer, a concurrent launch that won the race, or anything
    /// else) is fatal to the caller; there is no retry and no fallback
    /// port.
    pub async fn bind(addr: SocketAddr) -> Result<(Self, mpsc::UnboundedReceiver<Command>)> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("bound listener has no local address")?;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(listen(listener, commands.clone(), shutdown_rx));

        logger::log(&format!("Server: listening on {local_addr}"));
        Ok((
            Self {
                local_addr,
                commands,
                shutdown,
                listener: handle,
            },
            command_rx,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn commands(&self) -> mpsc::UnboundedSender<Command> {
        self.commands.clone()
    }

    /// Stops accepting and releases the endpoint so the next launch can
    /// bind. The join is bounded: a listener stuck mid-read gets logged
    /// and abandoned rather than holding up process exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        match time::timeout(LISTENER_JOIN_TIMEOUT, self.listener).await {
            Ok(_) => logger::log("Server: listener stopped"),
            Err(_) => logger::log("Server: listener did not stop in time, exiting anyway"),
        }
    }
}

async fn listen(
    listener: TcpListener,
    commands: mpsc::UnboundedSender<Command>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if !handle_connection(stream, peer, &commands).await {
                        break;
                    }
                }
                Err(err) => {
                    if *shutdown.borrow() {
                        break;
                    }
                    // Intake stays down until the process is restarted.
                    logger::log(&format!("Listener: accept failed, stopping intake: {err}"));
                    break;
                }
            },
        }
    }
    logger::log("Listener: stopped");
}

/// Reads, decodes, and enqueues one request. Bad requests are logged and
/// dropped without touching the loop; `false` means the queue is gone and
/// accepting more is pointless.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    commands: &mpsc::UnboundedSender<Command>,
) -> bool {
    let request = match time::timeout(RECV_TIMEOUT, protocol::read_request(stream)).await {
        Ok(Ok(request)) => request,
        Ok(Err(err)) => {
            logger::log(&format!("Listener: dropped request from {peer}: {err:#}"));
            return true;
        }
        Err(_) => {
            logger::log(&format!("Listener: dropped request from {peer}: timed out"));
            return true;
        }
    };

    let command = match Command::from_request(request) {
        Ok(command) => command,
        Err(err) => {
            logger::log(&format!("Listener: dropped request from {peer}: {err:#}"));
            return true;
        }
    };

    commands.send(command).is_ok()
}
