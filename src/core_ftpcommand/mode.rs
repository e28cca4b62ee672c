use crate::session::{Session, SessionState};

/// Handles the MODE FTP command: S selects plain stream transfers, Z the
/// deflate transmission mode.
pub async fn handle_mode_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    let arg = arg.trim();
    if arg.eq_ignore_ascii_case("S") {
        session.deflate = false;
        session.send_response("200 OK\r\n");
    } else if arg.eq_ignore_ascii_case("Z") {
        session.deflate = true;
        session.send_response("200 OK\r\n");
    } else {
        session.send_response("504 Unavailable\r\n");
    }
    Ok(())
}
