use crate::session::{Session, SessionState};

/// Handles the MDTM FTP command. Advertised in FEAT but not implemented;
/// the Modify fact of MLST covers the use case.
pub async fn handle_mdtm_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    if !session.authorized() {
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    session.send_response("502 Command not implemented\r\n");
    Ok(())
}
