use crate::session::{Session, SessionState};

/// Handles the STRU FTP command. Only file structure is supported.
pub async fn handle_stru_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    if arg.trim().eq_ignore_ascii_case("F") {
        session.send_response("200 OK\r\n");
    } else {
        session.send_response("504 Unavailable\r\n");
    }
    Ok(())
}
