use crate::core_network::error::TransferError;
use crate::session::TransferType;
use crate::watchdog::Watchdog;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Streams `source` to the data connection until end of input, then shuts
/// the data connection down. Returns the number of bytes written.
///
/// In ASCII mode bare `\n` line endings are sent as `\r\n`. Every chunk
/// that reaches the peer counts as session activity.
pub async fn send_stream<R, W>(
    source: &mut R,
    data: &mut W,
    transfer_type: TransferType,
    buffer_size: usize,
    watchdog: &Watchdog,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut translated = Vec::new();
    let mut last_was_cr = false;
    let mut sent = 0u64;

    loop {
        let bytes_read = source
            .read(&mut buffer)
            .await
            .map_err(TransferError::Read)?;
        if bytes_read == 0 {
            break;
        }

        let chunk = match transfer_type {
            TransferType::Binary => &buffer[..bytes_read],
            TransferType::Ascii => {
                translated.clear();
                last_was_cr = to_network_ascii(&buffer[..bytes_read], last_was_cr, &mut translated);
                &translated[..]
            }
        };

        data.write_all(chunk).await.map_err(TransferError::Write)?;
        sent += chunk.len() as u64;
        watchdog.defer();
    }

    data.flush().await.map_err(TransferError::Write)?;
    data.shutdown().await.map_err(TransferError::Write)?;
    Ok(sent)
}

/// Appends `input` to `out`, inserting `\r` before every `\n` that does not
/// already follow one. `prev_was_cr` carries state across chunk boundaries;
/// the return value is the new state.
pub fn to_network_ascii(input: &[u8], prev_was_cr: bool, out: &mut Vec<u8>) -> bool {
    let mut prev_was_cr = prev_was_cr;
    out.reserve(input.len());
    for &byte in input {
        if byte == b'\n' && !prev_was_cr {
            out.push(b'\r');
        }
        out.push(byte);
        prev_was_cr = byte == b'\r';
    }
    prev_was_cr
}
