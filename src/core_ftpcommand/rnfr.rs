use crate::helpers::strerror;
use crate::session::{Session, SessionState};

/// Handles the RNFR FTP command.
///
/// Stashes the source path for the RNTO that must come next; any other
/// intervening command clears it before dispatch.
pub async fn handle_rnfr_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    if !session.authorized() {
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    let path = match session.build_resolved_path(arg).await {
        Ok(path) => path,
        Err(e) => {
            let response = format!("553 {}\r\n", strerror(&e));
            session.send_response(&response);
            return Ok(());
        }
    };

    // the source has to exist before we promise anything
    if let Err(e) = tokio::fs::symlink_metadata(session.real_path(&path)).await {
        let response = format!("450 {}\r\n", strerror(&e));
        session.send_response(&response);
        return Ok(());
    }

    session.rename_from = Some(path);
    session.send_response("350 OK\r\n");
    Ok(())
}
