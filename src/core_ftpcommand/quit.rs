use crate::session::Session;

/// Handles the QUIT FTP command.
pub async fn handle_quit_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.send_response("221 Disconnecting\r\n");
    session.close_command();
    Ok(())
}
