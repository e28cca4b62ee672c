use crate::session::{Session, SessionState};

/// Handles the ABOR FTP command.
///
/// Mid-transfer both the 225 and the 426 go out, then the data channel is
/// torn down while the control connection stays up.
pub async fn handle_abor_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    if session.state == SessionState::Command {
        session.send_response("225 No transfer to abort\r\n");
        return Ok(());
    }

    session.send_response("225 Aborted\r\n");
    session.send_response("426 Transfer aborted\r\n");
    session.set_state(SessionState::Command, true, true);
    Ok(())
}
