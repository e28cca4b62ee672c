use crate::session::{Session, SessionState};

/// Handles the FEAT FTP command.
///
/// The MLST line carries a `*` on every fact that is currently enabled.
pub async fn handle_feat_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    let facts = session.facts;
    let star = |enabled: bool| if enabled { "*" } else { "" };

    let response = format!(
        "211-\r\n\
         \x20MDTM\r\n\
         \x20MLST Type{};Size{};Modify{};Perm{};UNIX.mode{};\r\n\
         \x20MODE Z\r\n\
         \x20PASV\r\n\
         \x20SIZE\r\n\
         \x20TVFS\r\n\
         \x20UTF8\r\n\
         \r\n\
         211 End\r\n",
        star(facts.ty),
        star(facts.size),
        star(facts.modify),
        star(facts.perm),
        star(facts.unix_mode),
    );

    session.send_response(&response);
    Ok(())
}
