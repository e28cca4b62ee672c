use crate::session::{Session, SessionState};

/// Handles the HELP FTP command.
pub async fn handle_help_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    session.set_state(SessionState::Command, false, false);

    session.send_response(
        "214-\r\n\
         The following commands are recognized\r\n\
         \x20ABOR ALLO APPE CDUP CWD DELE FEAT HELP LIST MDTM MKD MLSD MLST MODE\r\n\
         \x20NLST NOOP OPTS PASS PASV PORT PWD QUIT REST RETR RMD RNFR RNTO SITE\r\n\
         \x20SIZE STAT STOR STOU STRU SYST TYPE USER XCUP XCWD XMKD XPWD XRMD\r\n\
         214 End\r\n",
    );
    Ok(())
}
