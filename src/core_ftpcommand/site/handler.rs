use log::{info, warn};

use crate::constants::FTPDCONFIG;
use crate::session::{Session, SessionState};

/// Handles the SITE FTP command and its vendor subcommands.
///
/// SITE HELP is open to anyone; everything else requires a login. The
/// mutating subcommands edit the shared configuration, and SITE SAVE makes
/// the current state stick.
pub async fn handle_site_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    let trimmed = arg.trim();
    let (subcommand, sub_arg) = match trimmed.find(' ') {
        Some(pos) => (&trimmed[..pos], trimmed[pos + 1..].trim()),
        None => (trimmed, ""),
    };

    if subcommand.eq_ignore_ascii_case("HELP") {
        session.send_response(
            "211-\r\n\
             \x20Show this help: SITE HELP\r\n\
             \x20Set username: SITE USER <NAME>\r\n\
             \x20Set password: SITE PASS <PASS>\r\n\
             \x20Set port: SITE PORT <PORT>\r\n\
             \x20Set deflate level: SITE DEFLATE <LEVEL>\r\n\
             \x20Set hostname: SITE HOST <HOSTNAME>\r\n\
             \x20Set mtime lookup: SITE MTIME [0|1]\r\n\
             \x20Save config: SITE SAVE\r\n\
             211 End\r\n",
        );
        return Ok(());
    }

    if !session.authorized() {
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    if subcommand.eq_ignore_ascii_case("USER") {
        session.config.lock().await.user = String::from(sub_arg);
        info!("Configured user changed");
        session.send_response("200 OK\r\n");
    } else if subcommand.eq_ignore_ascii_case("PASS") {
        session.config.lock().await.pass = String::from(sub_arg);
        info!("Configured password changed");
        session.send_response("200 OK\r\n");
    } else if subcommand.eq_ignore_ascii_case("PORT") {
        if session.config.lock().await.set_port(sub_arg) {
            session.send_response("200 OK\r\n");
        } else {
            session.send_response("550 Invalid argument\r\n");
        }
    } else if subcommand.eq_ignore_ascii_case("DEFLATE") {
        if session.config.lock().await.set_deflate_level(sub_arg) {
            session.send_response("200 OK\r\n");
        } else {
            session.send_response("550 Invalid argument\r\n");
        }
    } else if subcommand.eq_ignore_ascii_case("HOST") {
        session.config.lock().await.hostname = String::from(sub_arg);
        session.send_response("200 OK\r\n");
    } else if subcommand.eq_ignore_ascii_case("MTIME") {
        match sub_arg {
            "0" => {
                session.config.lock().await.get_mtime = false;
                session.send_response("200 OK\r\n");
            }
            "1" => {
                session.config.lock().await.get_mtime = true;
                session.send_response("200 OK\r\n");
            }
            _ => session.send_response("550 Invalid argument\r\n"),
        }
    } else if subcommand.eq_ignore_ascii_case("SAVE") {
        let result = session.config.lock().await.save(FTPDCONFIG).await;
        match result {
            Ok(()) => session.send_response("200 OK\r\n"),
            Err(e) => {
                let response = format!("550 {}\r\n", crate::helpers::strerror(&e));
                session.send_response(&response);
            }
        }
    } else {
        warn!("Unknown SITE subcommand: {}", subcommand);
        session.send_response("550 Invalid command\r\n");
    }

    Ok(())
}
