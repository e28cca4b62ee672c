use crate::session::Session;

/// Handles the NOOP FTP command.
pub async fn handle_noop_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.send_response("200 OK\r\n");
    Ok(())
}
