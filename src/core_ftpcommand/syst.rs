use crate::session::{Session, SessionState};

/// Handles the SYST FTP command.
pub async fn handle_syst_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);
    session.send_response("215 UNIX Type: L8\r\n");
    Ok(())
}
