use crate::session::{Session, SessionState};

fn has_prefix_ignore_case(arg: &str, prefix: &str) -> bool {
    arg.len() >= prefix.len()
        && arg
            .get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
}

/// Handles the OPTS FTP command.
///
/// Three forms are understood: `UTF8 [ON|NLST]` (paths are always UTF-8
/// here, so this is a cheerful no-op), `MLST <fact-list>` which resets and
/// re-enables the listing facts, and `MODE Z LEVEL n` for the deflate
/// level.
pub async fn handle_opts_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    let trimmed = arg.trim();

    if trimmed.eq_ignore_ascii_case("UTF8")
        || trimmed.eq_ignore_ascii_case("UTF8 ON")
        || trimmed.eq_ignore_ascii_case("UTF8 NLST")
    {
        session.send_response("200 OK\r\n");
        return Ok(());
    }

    if has_prefix_ignore_case(arg, "MLST ") {
        let facts = &mut session.facts;
        facts.ty = false;
        facts.size = false;
        facts.modify = false;
        facts.perm = false;
        facts.unix_mode = false;

        for fact in arg[5..].split(';') {
            let fact = fact.trim();
            if fact.eq_ignore_ascii_case("Type") {
                facts.ty = true;
            } else if fact.eq_ignore_ascii_case("Size") {
                facts.size = true;
            } else if fact.eq_ignore_ascii_case("Modify") {
                facts.modify = true;
            } else if fact.eq_ignore_ascii_case("Perm") {
                facts.perm = true;
            } else if fact.eq_ignore_ascii_case("UNIX.mode") {
                facts.unix_mode = true;
            }
        }

        let facts = session.facts;
        let any = facts.ty || facts.size || facts.modify || facts.perm || facts.unix_mode;
        let response = format!(
            "200 MLST OPTS{}{}{}{}{}{}\r\n",
            if any { " " } else { "" },
            if facts.ty { "Type;" } else { "" },
            if facts.size { "Size;" } else { "" },
            if facts.modify { "Modify;" } else { "" },
            if facts.perm { "Perm;" } else { "" },
            if facts.unix_mode { "UNIX.mode;" } else { "" },
        );
        session.send_response(&response);
        return Ok(());
    }

    if has_prefix_ignore_case(arg, "MODE Z ") {
        let mut level = None;
        let mut words = arg[7..].split_ascii_whitespace();

        while let Some(word) = words.next() {
            if !word.eq_ignore_ascii_case("LEVEL") {
                session.send_response("501 Invalid argument\r\n");
                return Ok(());
            }

            match words.next() {
                Some(value) if value.len() == 1 && value.as_bytes()[0].is_ascii_digit() => {
                    level = Some(u32::from(value.as_bytes()[0] - b'0'));
                }
                _ => {
                    session.send_response("501 Invalid argument\r\n");
                    return Ok(());
                }
            }
        }

        let Some(level) = level else {
            session.send_response("501 Invalid argument\r\n");
            return Ok(());
        };

        session.config.lock().await.deflate_level = level;
        let response = format!("200 MODE Z LEVEL set to {}\r\n", level);
        session.send_response(&response);
        return Ok(());
    }

    session.send_response("504 Invalid argument\r\n");
    Ok(())
}
