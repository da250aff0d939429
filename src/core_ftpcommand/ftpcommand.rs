#[allow(clippy::upper_case_acronyms)]
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    USER,
    PASS,
    QUIT,
    NOOP,
    SYST,
    HELP,
    FEAT,
    PWD,
    CWD,
    CDUP,
    TYPE,
    MODE,
    STRU,
    PASV,
    EPSV,
    PORT,
    EPRT,
    LIST,
    NLST,
    RETR,
    SIZE,
    MDTM,
    REST,
    // Write-capable verbs, recognised only to be refused.
    STOR,
    STOU,
    APPE,
    DELE,
    RNFR,
    RNTO,
    MKD,
    RMD,
    SITE,
    ALLO,
}

/// Why a command line could not be turned into a command.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
}

impl FtpCommand {
    pub fn from_verb(verb: &str) -> Option<FtpCommand> {
        match verb.to_ascii_uppercase().as_str() {
            "USER" => Some(FtpCommand::USER),
            "PASS" => Some(FtpCommand::PASS),
            "QUIT" => Some(FtpCommand::QUIT),
            "NOOP" => Some(FtpCommand::NOOP),
            "SYST" => Some(FtpCommand::SYST),
            "HELP" => Some(FtpCommand::HELP),
            "FEAT" => Some(FtpCommand::FEAT),
            "PWD" | "XPWD" => Some(FtpCommand::PWD),
            "CWD" | "XCWD" => Some(FtpCommand::CWD),
            "CDUP" | "XCUP" => Some(FtpCommand::CDUP),
            "TYPE" => Some(FtpCommand::TYPE),
            "MODE" => Some(FtpCommand::MODE),
            "STRU" => Some(FtpCommand::STRU),
            "PASV" => Some(FtpCommand::PASV),
            "EPSV" => Some(FtpCommand::EPSV),
            "PORT" => Some(FtpCommand::PORT),
            "EPRT" => Some(FtpCommand::EPRT),
            "LIST" => Some(FtpCommand::LIST),
            "NLST" => Some(FtpCommand::NLST),
            "RETR" => Some(FtpCommand::RETR),
            "SIZE" => Some(FtpCommand::SIZE),
            "MDTM" => Some(FtpCommand::MDTM),
            "REST" => Some(FtpCommand::REST),
            "STOR" => Some(FtpCommand::STOR),
            "STOU" => Some(FtpCommand::STOU),
            "APPE" => Some(FtpCommand::APPE),
            "DELE" => Some(FtpCommand::DELE),
            "RNFR" => Some(FtpCommand::RNFR),
            "RNTO" => Some(FtpCommand::RNTO),
            "MKD" | "XMKD" => Some(FtpCommand::MKD),
            "RMD" | "XRMD" => Some(FtpCommand::RMD),
            "SITE" => Some(FtpCommand::SITE),
            "ALLO" => Some(FtpCommand::ALLO),
            _ => None,
        }
    }

    /// Verbs that would modify the served tree.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            FtpCommand::STOR
                | FtpCommand::STOU
                | FtpCommand::APPE
                | FtpCommand::DELE
                | FtpCommand::RNFR
                | FtpCommand::RNTO
                | FtpCommand::MKD
                | FtpCommand::RMD
                | FtpCommand::SITE
                | FtpCommand::ALLO
        )
    }

    pub fn allowed_before_login(&self) -> bool {
        matches!(
            self,
            FtpCommand::USER
                | FtpCommand::PASS
                | FtpCommand::QUIT
                | FtpCommand::NOOP
                | FtpCommand::SYST
                | FtpCommand::HELP
                | FtpCommand::FEAT
        )
    }
}

/// Splits a command line into its verb and argument.
///
/// The verb ends at the first space and is matched case-insensitively. The
/// argument is everything after that space, kept verbatim so file names
/// with inner spaces survive.
pub fn parse_command_line(line: &str) -> Result<(FtpCommand, String), ParseError> {
    let line = line.trim_start();
    let (verb, arg) = line.split_once(' ').unwrap_or((line, ""));
    if verb.is_empty() {
        return Err(ParseError::Empty);
    }

    FtpCommand::from_verb(verb)
        .map(|command| (command, arg.to_string()))
        .ok_or_else(|| ParseError::Unknown(verb.to_ascii_uppercase()))
}
