use crate::core_ftpcommand::ftpcommand::{parse_command_line, FtpCommand, ParseError};
use crate::core_ftpcommand::{
    cdup, cwd, denied, help, list, mdtm, mode, noop, pass, pwd, quit, rest, retr, size, syst,
    type_, user,
};
use crate::core_network::error::SessionError;
use crate::core_network::{pasv, port};
use crate::session::{Flow, Session};
use log::debug;

/// Parses one command line and runs the matching handler.
///
/// Unknown or empty commands get an error reply and leave the session
/// running. Write verbs are refused whatever the login state, and
/// everything except the login/courtesy commands requires a login.
pub async fn dispatch(session: &mut Session, line: &str) -> Result<Flow, SessionError> {
    let (command, arg) = match parse_command_line(line) {
        Ok(parsed) => parsed,
        Err(ParseError::Empty) => {
            session
                .reply(500, "Syntax error, command unrecognized.")
                .await?;
            return Ok(Flow::Continue);
        }
        Err(ParseError::Unknown(verb)) => {
            debug!("{}: unknown command {}", session.peer, verb);
            session.reply(502, "Command not implemented.").await?;
            return Ok(Flow::Continue);
        }
    };

    if command == FtpCommand::PASS {
        debug!("{}: received command: PASS ****", session.peer);
    } else {
        debug!("{}: received command: {}", session.peer, line);
    }

    if !command.is_write() && !command.allowed_before_login() && !session.is_logged_in() {
        session
            .reply(530, "Please login with USER and PASS.")
            .await?;
        return Ok(Flow::Continue);
    }

    let arg = arg.as_str();
    match command {
        FtpCommand::USER => user::handle_user_command(session, arg).await?,
        FtpCommand::PASS => pass::handle_pass_command(session, arg).await?,
        FtpCommand::QUIT => {
            quit::handle_quit_command(session).await?;
            return Ok(Flow::Quit);
        }
        FtpCommand::NOOP => noop::handle_noop_command(session).await?,
        FtpCommand::SYST => syst::handle_syst_command(session).await?,
        FtpCommand::HELP => help::handle_help_command(session).await?,
        FtpCommand::FEAT => help::handle_feat_command(session).await?,
        FtpCommand::PWD => pwd::handle_pwd_command(session).await?,
        FtpCommand::CWD => cwd::handle_cwd_command(session, arg).await?,
        FtpCommand::CDUP => cdup::handle_cdup_command(session).await?,
        FtpCommand::TYPE => type_::handle_type_command(session, arg).await?,
        FtpCommand::MODE => mode::handle_mode_command(session, arg).await?,
        FtpCommand::STRU => mode::handle_stru_command(session, arg).await?,
        FtpCommand::PASV => pasv::handle_pasv_command(session, arg).await?,
        FtpCommand::EPSV => pasv::handle_epsv_command(session, arg).await?,
        FtpCommand::PORT => port::handle_port_command(session, arg).await?,
        FtpCommand::EPRT => port::handle_eprt_command(session, arg).await?,
        FtpCommand::LIST => list::handle_list_command(session, arg).await?,
        FtpCommand::NLST => list::handle_nlst_command(session, arg).await?,
        FtpCommand::RETR => retr::handle_retr_command(session, arg).await?,
        FtpCommand::SIZE => size::handle_size_command(session, arg).await?,
        FtpCommand::MDTM => mdtm::handle_mdtm_command(session, arg).await?,
        FtpCommand::REST => rest::handle_rest_command(session, arg).await?,
        FtpCommand::STOR
        | FtpCommand::STOU
        | FtpCommand::APPE
        | FtpCommand::DELE
        | FtpCommand::RNFR
        | FtpCommand::RNTO
        | FtpCommand::MKD
        | FtpCommand::RMD
        | FtpCommand::SITE
        | FtpCommand::ALLO => denied::handle_denied_command(session, command).await?,
    }

    Ok(Flow::Continue)
}
