use crate::core_ftpcommand::utils::{establish_data_connection, reject_path};
use crate::core_network::error::SessionError;
use crate::core_network::transfer::send_stream;
use crate::session::{Session, TransferType};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::fs::Metadata;
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

/// Listings younger than this show a time of day, older ones a year.
const RECENT_DAYS: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    /// `ls -l` style, for LIST.
    Long,
    /// Bare names, for NLST.
    NamesOnly,
}

pub async fn handle_list_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    send_listing(session, arg, ListingFormat::Long).await
}

pub async fn handle_nlst_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    send_listing(session, arg, ListingFormat::NamesOnly).await
}

async fn send_listing(
    session: &mut Session,
    arg: &str,
    format: ListingFormat,
) -> Result<(), SessionError> {
    // The pending data channel is used up by this command whatever happens.
    let channel = session.data_channel.take();

    let target = strip_list_options(arg);
    let resolved = match session.resolve(target) {
        Ok(resolved) => resolved,
        Err(e) => return reject_path(session, e, "550 No such file or directory.").await,
    };

    let listing = match build_listing(resolved.real_path(), resolved.file_name(), format).await {
        Ok(listing) => listing,
        Err(e) => {
            warn!(
                "{}: failed to list {}: {}",
                session.peer,
                resolved.virtual_path(),
                e
            );
            return session.reply(450, "Failed to list directory.").await;
        }
    };

    let mut data = match establish_data_connection(session, channel).await? {
        Some(data) => data,
        None => return Ok(()),
    };

    session
        .reply(150, "Here comes the directory listing.")
        .await?;

    let mut source: &[u8] = listing.as_bytes();
    let result = send_stream(
        &mut source,
        &mut data,
        TransferType::Binary,
        session.config.download_buffer_size,
        &session.watchdog,
    )
    .await;
    drop(data);

    match result {
        Ok(bytes) => {
            info!(
                "{}: listed {} ({} bytes)",
                session.peer,
                resolved.virtual_path(),
                bytes
            );
            session.reply(226, "Directory send OK.").await
        }
        Err(e) => {
            warn!("{}: listing aborted: {}", session.peer, e);
            session.reply_line(e.to_ftp_response()).await
        }
    }
}

/// Drops leading `ls`-style option tokens such as `-la`, which many clients
/// send with LIST.
pub fn strip_list_options(arg: &str) -> &str {
    let mut rest = arg.trim();
    while rest.starts_with('-') {
        rest = match rest.split_once(' ') {
            Some((_, tail)) => tail.trim_start(),
            None => "",
        };
    }
    rest
}

/// Produces the listing text, CRLF-terminated lines sorted by name. A
/// directory lists its entries; anything else lists itself as `name`.
///
/// Entries are described by their own metadata, so a symbolic link is
/// shown as a link and its target is never touched.
pub async fn build_listing(path: &Path, name: &str, format: ListingFormat) -> io::Result<String> {
    let metadata = tokio::fs::metadata(path).await?;
    let mut entries = Vec::new();

    if metadata.is_dir() {
        let mut dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let entry_name = entry.file_name().to_string_lossy().into_owned();
            match entry.metadata().await {
                Ok(entry_metadata) => entries.push((entry_name, entry_metadata)),
                Err(e) => warn!("Skipping {:?} in listing: {}", entry_name, e),
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
    } else {
        entries.push((name.to_string(), metadata));
    }

    let now = Utc::now();
    let mut listing = String::new();
    for (entry_name, entry_metadata) in &entries {
        let entry_name = entry_name.replace(['\r', '\n'], "?");
        match format {
            ListingFormat::Long => {
                listing.push_str(&format_long_entry(&entry_name, entry_metadata, now))
            }
            ListingFormat::NamesOnly => listing.push_str(&entry_name),
        }
        listing.push_str("\r\n");
    }
    Ok(listing)
}

/// One `ls -l` line, without the line terminator.
pub fn format_long_entry(name: &str, metadata: &Metadata, now: DateTime<Utc>) -> String {
    let modified: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(now);
    let date = if (now - modified).num_days().abs() < RECENT_DAYS {
        modified.format("%b %e %H:%M")
    } else {
        modified.format("%b %e  %Y")
    };

    format!(
        "{}{} {:>3} {:<8} {:<8} {:>12} {} {}",
        file_type_char(metadata),
        format_permissions(metadata.mode()),
        metadata.nlink(),
        metadata.uid(),
        metadata.gid(),
        metadata.len(),
        date,
        name
    )
}

fn file_type_char(metadata: &Metadata) -> char {
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'l'
    } else if file_type.is_block_device() {
        'b'
    } else if file_type.is_char_device() {
        'c'
    } else if file_type.is_fifo() {
        'p'
    } else if file_type.is_socket() {
        's'
    } else {
        '-'
    }
}

pub fn format_permissions(mode: u32) -> String {
    const FLAGS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    FLAGS
        .iter()
        .map(|&(bit, flag)| if mode & bit != 0 { flag } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_strip_list_options() {
        assert_eq!(strip_list_options("-la"), "");
        assert_eq!(strip_list_options("-l -a pub"), "pub");
        assert_eq!(strip_list_options("  pub/docs "), "pub/docs");
        assert_eq!(strip_list_options(""), "");
    }

    #[test]
    fn test_format_permissions() {
        assert_eq!(format_permissions(0o755), "rwxr-xr-x");
        assert_eq!(format_permissions(0o640), "rw-r-----");
        assert_eq!(format_permissions(0o100644), "rw-r--r--");
    }

    #[tokio::test]
    async fn test_names_listing_is_sorted_and_complete() {
        let dir = TempDir::new().unwrap();
        for name in ["zeta.txt", "alpha.txt", "Mid", ".hidden"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();

        let listing = build_listing(dir.path(), "/", ListingFormat::NamesOnly)
            .await
            .unwrap();
        assert_eq!(listing, ".hidden\r\nMid\r\nalpha.txt\r\nsub\r\nzeta.txt\r\n");
    }

    #[tokio::test]
    async fn test_long_listing_shows_types() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file.txt"), b"12345").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        symlink("/etc/passwd", dir.path().join("link")).unwrap();

        let listing = build_listing(dir.path(), "/", ListingFormat::Long)
            .await
            .unwrap();
        let lines: Vec<&str> = listing.split("\r\n").filter(|l| !l.is_empty()).collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('-') && lines[0].ends_with(" file.txt"));
        assert!(lines[0].contains(" 5 "));
        assert!(lines[1].starts_with('l') && lines[1].ends_with(" link"));
        assert!(lines[2].starts_with('d') && lines[2].ends_with(" sub"));
    }

    #[tokio::test]
    async fn test_listing_a_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readme.txt");
        fs::write(&path, b"hello").unwrap();

        let listing = build_listing(&path, "readme.txt", ListingFormat::NamesOnly)
            .await
            .unwrap();
        assert_eq!(listing, "readme.txt\r\n");
    }
}
