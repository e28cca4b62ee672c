use crate::core_transfer::{self, XferDirMode};
use crate::session::{Session, SessionState};

/// Handles the LIST FTP command.
pub async fn handle_list_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    core_transfer::xfer_dir(session, arg, XferDirMode::List, true).await;
    Ok(())
}

/// Handles the NLST FTP command. A wildcard argument goes through the glob
/// pump instead of a plain directory walk.
pub async fn handle_nlst_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    if arg.contains('*') {
        core_transfer::xfer_glob(session, arg);
        return Ok(());
    }

    core_transfer::xfer_dir(session, arg, XferDirMode::Nlst, false).await;
    Ok(())
}

/// Handles the MLSD FTP command.
pub async fn handle_mlsd_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    core_transfer::xfer_dir(session, arg, XferDirMode::Mlsd, false).await;
    Ok(())
}

/// Handles the MLST FTP command; the facts ride the control channel.
pub async fn handle_mlst_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    core_transfer::xfer_dir(session, arg, XferDirMode::Mlst, false).await;
    Ok(())
}
