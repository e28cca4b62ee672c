//! Accept loop and the per-session driver.
//!
//! Each client gets one task that multiplexes its control and data work: in
//! COMMAND state it waits for the next command line, and while a transfer is
//! active it races the next pump step against the control socket so ABOR and
//! friends are still seen. Either way a session that makes no progress for
//! IDLE_TIMEOUT seconds is torn down.

use anyhow::Result;
use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::config::SharedConfig;
use crate::constants::IDLE_TIMEOUT;
use crate::core_ftpcommand::handlers::process_commands;
use crate::core_transfer::{self, StepResult};
use crate::server::ServerState;
use crate::session::{Session, SessionState};

pub async fn start_server(config: SharedConfig, state: Arc<ServerState>) -> Result<()> {
    let port = config.lock().await.port;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Server listening on port {}", port);

    loop {
        let (socket, addr) = listener.accept().await?;
        info!("New connection from {}", addr);

        let config = Arc::clone(&config);
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            match handle_connection(socket, config, state).await {
                Ok(()) => info!("Connection closed for {}", addr),
                Err(e) => warn!("Connection error for {}: {}", addr, e),
            }
        });
    }
}

/// What a driver iteration woke up for.
enum Wake {
    Control(io::Result<usize>),
    Step(StepResult),
    Idle,
}

pub async fn handle_connection(
    socket: TcpStream,
    config: SharedConfig,
    state: Arc<ServerState>,
) -> io::Result<()> {
    socket.set_nodelay(true).ok();

    let mut session = Session::new(socket, config, state).await?;
    drive_session(&mut session).await
}

async fn drive_session(session: &mut Session) -> io::Result<()> {
    let idle = Duration::from_secs(IDLE_TIMEOUT);

    loop {
        session.flush_responses().await?;

        if session.closing {
            session.control_wr.shutdown().await.ok();
            return Ok(());
        }

        if session.command_buffer.free_size() == 0 {
            error!("Exceeded command buffer size");
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "command buffer overflow",
            ));
        }

        let wake = if session.transfer.is_some() {
            let Session {
                control_rd,
                control_wr,
                command_buffer,
                transfer,
                data,
                ..
            } = &mut *session;

            let Some(transfer) = transfer.as_mut() else {
                unreachable!();
            };

            match timeout(idle, async {
                tokio::select! {
                    read = control_rd.read(command_buffer.free_area_mut()) => Wake::Control(read),
                    step = core_transfer::step(transfer, data, control_wr) => Wake::Step(step),
                }
            })
            .await
            {
                Ok(wake) => wake,
                Err(_) => Wake::Idle,
            }
        } else {
            match timeout(
                idle,
                session
                    .control_rd
                    .read(session.command_buffer.free_area_mut()),
            )
            .await
            {
                Ok(read) => Wake::Control(read),
                Err(_) => Wake::Idle,
            }
        };

        match wake {
            Wake::Idle => {
                info!("Idle timeout for {}", session.peer_addr);
                return Ok(());
            }
            Wake::Control(Err(e)) => return Err(e),
            Wake::Control(Ok(0)) => {
                info!("Peer closed connection");
                return Ok(());
            }
            Wake::Control(Ok(n)) => {
                session.command_buffer.mark_used(n);
                process_commands(session).await?;
            }
            Wake::Step(StepResult::Continue) => {}
            Wake::Step(StepResult::Opened) => {
                session.send_response("150 Ready\r\n");
                session.set_state(SessionState::DataTransfer, true, false);
            }
            Wake::Step(StepResult::Done(reply)) => {
                if let Some(transfer) = &session.transfer {
                    debug!(
                        "Transfer {:?} ended at {}/{} bytes ({} on the z-stream)",
                        transfer.work_item,
                        transfer.file_position,
                        transfer.file_size,
                        transfer.zstream_position,
                    );
                }
                session.send_response(&reply);
                session.set_state(SessionState::Command, true, true);
            }
        }
    }
}
