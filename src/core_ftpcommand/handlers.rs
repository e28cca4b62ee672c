//! Command extraction and dispatch.

use log::info;
use std::io;

use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::parser;
use crate::core_path::encode_path;
use crate::helpers::redact_command;
use crate::session::{Session, SessionState};

use crate::core_ftpcommand::{
    abor, allo, cdup, cwd, dele, feat, help, list, mdtm, mkd, mode, noop, opts, pass, pwd, quit,
    rest, retr, rmd, rnfr, rnto, site, size, stat, stor, stru, syst, type_, user,
};
use crate::core_network::{pasv, port};

/// Pull every complete command line out of the buffer and run it. Called
/// whenever the control socket delivered bytes; commands are handled
/// strictly in arrival order.
pub async fn process_commands(session: &mut Session) -> io::Result<()> {
    loop {
        parser::strip_urgent(&mut session.command_buffer);

        let Some(line) = parser::next_command(&mut session.command_buffer) else {
            return Ok(());
        };

        info!("{} -> {}", session.peer_addr, redact_command(&line));
        dispatch(session, &line).await?;

        if session.closing {
            return Ok(());
        }
    }
}

/// Look the verb up and run its handler, enforcing the reduced command set
/// while a transfer is in flight.
pub async fn dispatch(session: &mut Session, line: &str) -> io::Result<()> {
    let (verb, args) = parser::split_verb(line);

    let Some(command) = FtpCommand::lookup(verb) else {
        let mut response = format!("502 Invalid command \"{}", encode_path(verb, false));
        if !args.is_empty() {
            response.push(' ');
            response.push_str(&encode_path(args, false));
        }
        response.push_str("\"\r\n");
        session.send_response(&response);
        return Ok(());
    };

    if session.state != SessionState::Command {
        if !command.allowed_during_transfer() {
            session.send_response("503 Invalid command during transfer\r\n");
            session.set_state(SessionState::Command, true, true);
            return Ok(());
        }
    } else if command != FtpCommand::RNTO {
        // a rename in flight survives only into an immediate RNTO
        session.rename_from = None;
    }

    match command {
        FtpCommand::ABOR => abor::handle_abor_command(session, args).await,
        FtpCommand::ALLO => allo::handle_allo_command(session, args).await,
        FtpCommand::APPE => stor::handle_appe_command(session, args).await,
        FtpCommand::CDUP => cdup::handle_cdup_command(session, args).await,
        FtpCommand::CWD => cwd::handle_cwd_command(session, args).await,
        FtpCommand::DELE => dele::handle_dele_command(session, args).await,
        FtpCommand::FEAT => feat::handle_feat_command(session, args).await,
        FtpCommand::HELP => help::handle_help_command(session, args).await,
        FtpCommand::LIST => list::handle_list_command(session, args).await,
        FtpCommand::MDTM => mdtm::handle_mdtm_command(session, args).await,
        FtpCommand::MKD => mkd::handle_mkd_command(session, args).await,
        FtpCommand::MLSD => list::handle_mlsd_command(session, args).await,
        FtpCommand::MLST => list::handle_mlst_command(session, args).await,
        FtpCommand::MODE => mode::handle_mode_command(session, args).await,
        FtpCommand::NLST => list::handle_nlst_command(session, args).await,
        FtpCommand::NOOP => noop::handle_noop_command(session, args).await,
        FtpCommand::OPTS => opts::handle_opts_command(session, args).await,
        FtpCommand::PASS => pass::handle_pass_command(session, args).await,
        FtpCommand::PASV => pasv::handle_pasv_command(session, args).await,
        FtpCommand::PORT => port::handle_port_command(session, args).await,
        FtpCommand::PWD => pwd::handle_pwd_command(session, args).await,
        FtpCommand::QUIT => quit::handle_quit_command(session, args).await,
        FtpCommand::REST => rest::handle_rest_command(session, args).await,
        FtpCommand::RETR => retr::handle_retr_command(session, args).await,
        FtpCommand::RMD => rmd::handle_rmd_command(session, args).await,
        FtpCommand::RNFR => rnfr::handle_rnfr_command(session, args).await,
        FtpCommand::RNTO => rnto::handle_rnto_command(session, args).await,
        FtpCommand::SITE => site::handle_site_command(session, args).await,
        FtpCommand::SIZE => size::handle_size_command(session, args).await,
        FtpCommand::STAT => stat::handle_stat_command(session, args).await,
        FtpCommand::STOR => stor::handle_stor_command(session, args).await,
        FtpCommand::STOU => stor::handle_stou_command(session, args).await,
        FtpCommand::STRU => stru::handle_stru_command(session, args).await,
        FtpCommand::SYST => syst::handle_syst_command(session, args).await,
        FtpCommand::TYPE => type_::handle_type_command(session, args).await,
        FtpCommand::USER => user::handle_user_command(session, args).await,
    }
}
