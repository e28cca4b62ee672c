use crate::helpers::strerror;
use crate::session::{Session, SessionState};

/// Handles the SIZE FTP command. Only regular files have a size to report.
pub async fn handle_size_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
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

    let st = match tokio::fs::metadata(session.real_path(&path)).await {
        Ok(st) => st,
        Err(e) => {
            let response = format!("550 {}\r\n", strerror(&e));
            session.send_response(&response);
            return Ok(());
        }
    };

    if !st.is_file() {
        session.send_response("550 Not a file\r\n");
        return Ok(());
    }

    let response = format!("213 {}\r\n", st.len());
    session.send_response(&response);
    Ok(())
}
