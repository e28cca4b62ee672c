use crate::session::{Session, SessionState};

/// Handles the USER FTP command.
///
/// An empty configured user accepts anyone; a configured one must match.
/// When no password is configured the login completes right here, otherwise
/// the client is asked for PASS.
pub async fn handle_user_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);
    session.authorized_user = false;

    let (user, pass) = {
        let config = session.config.lock().await;
        (config.user.clone(), config.pass.clone())
    };

    if user.is_empty() || user == arg {
        session.authorized_user = true;

        if pass.is_empty() {
            session.send_response("230 OK\r\n");
        } else {
            session.send_response("331 Need password\r\n");
        }
        return Ok(());
    }

    session.send_response("430 Invalid user\r\n");
    Ok(())
}
