use crate::core_transfer::{self, XferFileMode};
use crate::session::{Session, SessionState};

/// Handles the STOR FTP command.
pub async fn handle_stor_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    core_transfer::xfer_file(session, arg, XferFileMode::Stor).await;
    Ok(())
}

/// Handles the APPE FTP command.
pub async fn handle_appe_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    core_transfer::xfer_file(session, arg, XferFileMode::Appe).await;
    Ok(())
}

/// Handles the STOU FTP command.
pub async fn handle_stou_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);
    session.send_response("502 Command not implemented\r\n");
    Ok(())
}
