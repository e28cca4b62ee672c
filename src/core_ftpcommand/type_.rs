use crate::session::{Session, SessionState};

/// Handles the TYPE FTP command. Transfers are always binary; the argument
/// is accepted and ignored.
pub async fn handle_type_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);
    session.send_response("200 OK\r\n");
    Ok(())
}
