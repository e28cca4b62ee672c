use crate::helpers::strerror;
use crate::session::{Session, SessionState};

/// Handles the RNTO FTP command.
pub async fn handle_rnto_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    if !session.authorized() {
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    let Some(source) = session.rename_from.take() else {
        session.send_response("503 Bad sequence of commands\r\n");
        return Ok(());
    };

    let path = match session.build_resolved_path(arg).await {
        Ok(path) => path,
        Err(e) => {
            let response = format!("554 {}\r\n", strerror(&e));
            session.send_response(&response);
            return Ok(());
        }
    };

    if let Err(e) = tokio::fs::rename(session.real_path(&source), session.real_path(&path)).await {
        let response = format!("550 {}\r\n", strerror(&e));
        session.send_response(&response);
        return Ok(());
    }

    session.server.update_free_space();
    session.send_response("250 OK\r\n");
    Ok(())
}
