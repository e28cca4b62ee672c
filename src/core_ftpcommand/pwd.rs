use crate::core_path::encode_path;
use crate::session::Session;

/// Handles the PWD and XPWD FTP commands.
///
/// The reply quotes the directory, so embedded quotes are doubled on top of
/// the usual newline encoding.
pub async fn handle_pwd_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    let response = format!("257 \"{}\"\r\n", encode_path(&session.cwd, true));
    session.send_response(&response);
    Ok(())
}
