use crate::core_network::error::SessionError;
use crate::session::Session;

const HELP_LINES: [&str; 4] = [
    "USER PASS QUIT NOOP SYST HELP FEAT",
    "PWD  CWD  CDUP TYPE MODE STRU",
    "PASV EPSV PORT EPRT REST",
    "LIST NLST RETR SIZE MDTM",
];

const FEATURES: [&str; 5] = ["EPRT", "EPSV", "MDTM", "REST STREAM", "SIZE"];

pub async fn handle_help_command(session: &mut Session) -> Result<(), SessionError> {
    session
        .reply_multiline(
            214,
            "The following commands are recognized.",
            &HELP_LINES,
            "Help OK.",
        )
        .await
}

pub async fn handle_feat_command(session: &mut Session) -> Result<(), SessionError> {
    session
        .reply_multiline(211, "Features:", &FEATURES, "End")
        .await
}
