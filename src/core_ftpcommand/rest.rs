use crate::session::{Session, SessionState};

/// Handles the REST FTP command.
///
/// The offset is held until the next RETR/STOR/APPE consumes it and is
/// cleared whenever the session returns to COMMAND.
pub async fn handle_rest_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    if !session.authorized() {
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    let arg = arg.trim();
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        session.send_response("504 Invalid argument\r\n");
        return Ok(());
    }

    // parse::<u64> also catches overflow
    let Ok(position) = arg.parse::<u64>() else {
        session.send_response("504 Invalid argument\r\n");
        return Ok(());
    };

    session.restart_position = position;
    session.send_response("350 OK\r\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_overflowing_offset_is_rejected_by_parse() {
        assert!("18446744073709551616".parse::<u64>().is_err());
        assert!("18446744073709551615".parse::<u64>().is_ok());
    }
}
