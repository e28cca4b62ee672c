use crate::session::{Session, SessionState};

/// Handles the ALLO FTP command. Storage allocation is not a thing here.
pub async fn handle_allo_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);
    session.send_response("202 Superfluous command\r\n");
    Ok(())
}
