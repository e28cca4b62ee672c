use crate::helpers::strerror;
use crate::session::{Session, SessionState};

/// Handles the CWD and XCWD FTP commands.
pub async fn handle_cwd_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    if !session.authorized() {
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    if let Err(e) = session.change_dir(arg).await {
        let response = format!("550 {}\r\n", strerror(&e));
        session.send_response(&response);
        return Ok(());
    }

    session.send_response("200 OK\r\n");
    Ok(())
}
