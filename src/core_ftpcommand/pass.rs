use crate::session::{Session, SessionState};

/// Handles the PASS FTP command.
///
/// Only meaningful after a successful USER; never discloses whether the
/// user or the password was the wrong half.
pub async fn handle_pass_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);
    session.authorized_pass = false;

    let (user, pass) = {
        let config = session.config.lock().await;
        (config.user.clone(), config.pass.clone())
    };

    if !user.is_empty() && !session.authorized_user {
        session.send_response("430 User not authorized\r\n");
        return Ok(());
    }

    if pass.is_empty() || pass == arg {
        session.authorized_pass = true;
        session.send_response("230 OK\r\n");
        return Ok(());
    }

    session.send_response("430 Invalid password\r\n");
    Ok(())
}
