use crate::core_ftpcommand::utils::{establish_data_connection, reject_path};
use crate::core_network::error::SessionError;
use crate::core_network::transfer::send_stream;
use crate::session::Session;
use log::{error, info, warn};
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::AsyncSeekExt;

const NO_SUCH_FILE: &str = "550 No such file.";

/// Handles the RETR (Retrieve) FTP command.
///
/// Resolves the path through the jail, checks that it names a readable
/// regular file, then streams it once over the pending data connection in
/// the session's representation type. A REST offset, if any, applies to
/// this transfer only.
///
/// # Arguments
///
/// * `session` - The session requesting the file.
/// * `arg` - The virtual path of the file to retrieve.
///
/// # Returns
///
/// `Err` only for failures that end the session; everything else is
/// reported to the client.
pub async fn handle_retr_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    let channel = session.data_channel.take();
    let offset = std::mem::take(&mut session.restart_offset);

    if arg.is_empty() {
        warn!("RETR command received with no arguments");
        return session
            .reply(501, "Syntax error in parameters or arguments.")
            .await;
    }

    let resolved = match session.resolve(arg) {
        Ok(resolved) => resolved,
        Err(e) => return reject_path(session, e, NO_SUCH_FILE).await,
    };

    let mut file = match File::open(resolved.real_path()).await {
        Ok(file) => file,
        Err(e) => {
            info!("{}: cannot open {}: {}", session.peer, resolved.virtual_path(), e);
            return session.reply_line(NO_SUCH_FILE).await;
        }
    };

    let size = match file.metadata().await {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => return session.reply_line(NO_SUCH_FILE).await,
    };

    if offset > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(offset)).await {
            error!("{}: seek to {} failed: {}", session.peer, offset, e);
            return session
                .reply(451, "Requested action aborted: local error in processing.")
                .await;
        }
    }

    let mut data = match establish_data_connection(session, channel).await? {
        Some(data) => data,
        None => return Ok(()),
    };

    let opening = format!(
        "Opening {} mode data connection for {} ({} bytes).",
        session.transfer_type.label(),
        resolved.file_name(),
        size
    );
    session.reply(150, &opening).await?;
    info!(
        "{}: sending {} from offset {}",
        session.peer,
        resolved.virtual_path(),
        offset
    );

    let result = send_stream(
        &mut file,
        &mut data,
        session.transfer_type,
        session.config.download_buffer_size,
        &session.watchdog,
    )
    .await;
    drop(data);

    match result {
        Ok(bytes) => {
            info!(
                "{}: sent {} ({} bytes)",
                session.peer,
                resolved.virtual_path(),
                bytes
            );
            session.reply(226, "Transfer complete.").await
        }
        Err(e) => {
            warn!("{}: transfer of {} aborted: {}", session.peer, resolved.virtual_path(), e);
            session.reply_line(e.to_ftp_response()).await
        }
    }
}
