use crate::core_transfer::{self, XferFileMode};
use crate::session::{Session, SessionState};

/// Handles the RETR FTP command.
pub async fn handle_retr_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    core_transfer::xfer_file(session, arg, XferFileMode::Retr).await;
    Ok(())
}
