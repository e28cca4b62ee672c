use crate::core_transfer::{self, XferDirMode};
use crate::helpers::format_free_space;
use crate::session::{Session, SessionState};

/// Handles the STAT FTP command.
///
/// Three personalities: a liveness/progress probe during a transfer, an
/// uptime report with no argument, and an inline directory listing over the
/// control channel with one.
pub async fn handle_stat_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if session.state == SessionState::DataConnect {
        session.send_response(
            "211-FTP server status\r\n\
             \x20Waiting for data connection\r\n\
             211 End\r\n",
        );
        return Ok(());
    }

    if session.state == SessionState::DataTransfer {
        let transferred = session
            .transfer
            .as_ref()
            .map(|transfer| transfer.file_position)
            .unwrap_or(0);
        let response = format!(
            "211-FTP server status\r\n\
             \x20Transferred {} bytes\r\n\
             211 End\r\n",
            transferred
        );
        session.send_response(&response);
        return Ok(());
    }

    if arg.trim().is_empty() {
        let uptime = session.server.uptime_secs();
        let hours = uptime / 3600;
        let minutes = (uptime / 60) % 60;
        let seconds = uptime % 60;

        let response = format!(
            "211-FTP server status\r\n\
             \x20Uptime: {:02}:{:02}:{:02}\r\n\
             \x20Free space: {}\r\n\
             211 End\r\n",
            hours,
            minutes,
            seconds,
            format_free_space(session.server.free_space()),
        );
        session.send_response(&response);
        return Ok(());
    }

    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    core_transfer::xfer_dir(session, arg, XferDirMode::Stat, false).await;
    Ok(())
}
