use crate::constants::MAX_COMMAND_LINE;
use crate::core_jail::JailRoot;
use crate::core_network::network::{FtpListener, RunningServer, ServerConfig};
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const README: &[u8] = b"Welcome to the archive.\nNothing to see here.\n";
const WAIT: Duration = Duration::from_secs(5);

fn setup_tree() -> TempDir {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("readme.txt"), README).unwrap();
    fs::create_dir(root.path().join("pub")).unwrap();
    fs::write(root.path().join("pub").join("data.bin"), [0u8, 1, 2, 13, 10, 255]).unwrap();
    root
}

fn test_config(root: &TempDir, max_clients: usize, idle_timeout: Duration) -> ServerConfig {
    ServerConfig {
        listen_address: String::from("127.0.0.1"),
        listen_port: 0,
        max_clients,
        idle_timeout,
        data_timeout: Duration::from_secs(5),
        download_buffer_size: 16,
        jail: JailRoot::new(root.path()).unwrap(),
    }
}

async fn start(config: ServerConfig) -> RunningServer {
    FtpListener::bind(config).await.unwrap().start()
}

async fn start_server(root: &TempDir, max_clients: usize) -> RunningServer {
    start(test_config(root, max_clients, Duration::from_secs(60))).await
}

/// Waits for finished sessions to hand their slots back.
async fn wait_for_sessions(server: &RunningServer, expected: usize) {
    timeout(WAIT, async {
        while server.active_sessions() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Connects and consumes the 220 greeting.
    async fn greeted(addr: SocketAddr) -> Self {
        let mut client = Self::connect(addr).await;
        let (code, _) = client.read_reply().await;
        assert_eq!(code, 220);
        client
    }

    async fn logged_in(addr: SocketAddr) -> Self {
        let mut client = Self::greeted(addr).await;
        assert_eq!(client.command("USER anonymous").await.0, 331);
        assert_eq!(client.command("PASS guest@example.com").await.0, 230);
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    /// Reads one complete reply, following multi-line continuations.
    async fn read_reply(&mut self) -> (u16, String) {
        let mut text = String::new();
        loop {
            let mut line = String::new();
            let read = timeout(WAIT, self.reader.read_line(&mut line))
                .await
                .unwrap()
                .unwrap();
            assert!(read > 0, "connection closed while waiting for a reply");
            assert!(line.ends_with("\r\n"), "reply line not CRLF terminated");
            text.push_str(&line);

            let bytes = line.as_bytes();
            if bytes.len() >= 4 && bytes[..3].iter().all(u8::is_ascii_digit) && bytes[3] == b' ' {
                let code = line[..3].parse().unwrap();
                return (code, text);
            }
        }
    }

    async fn command(&mut self, line: &str) -> (u16, String) {
        self.send(line).await;
        self.read_reply().await
    }

    /// True once the server has closed the control connection.
    async fn is_closed(&mut self) -> bool {
        let mut rest = Vec::new();
        matches!(
            timeout(WAIT, self.reader.read_to_end(&mut rest)).await,
            Ok(Ok(0))
        )
    }

    async fn pasv(&mut self) -> SocketAddr {
        let (code, text) = self.command("PASV").await;
        assert_eq!(code, 227, "{}", text);
        parse_pasv_reply(&text)
    }

    /// Runs a transfer command over a fresh passive connection and
    /// returns the bytes received.
    async fn passive_transfer(&mut self, line: &str) -> Vec<u8> {
        let data_addr = self.pasv().await;
        self.send(line).await;

        let mut data = TcpStream::connect(data_addr).await.unwrap();
        let mut received = Vec::new();
        timeout(WAIT, data.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(self.read_reply().await.0, 150);
        assert_eq!(self.read_reply().await.0, 226);
        received
    }
}

fn parse_pasv_reply(text: &str) -> SocketAddr {
    let start = text.find('(').unwrap() + 1;
    let end = text.find(')').unwrap();
    let numbers: Vec<u16> = text[start..end]
        .split(',')
        .map(|n| n.parse().unwrap())
        .collect();
    let addr = format!(
        "{}.{}.{}.{}:{}",
        numbers[0],
        numbers[1],
        numbers[2],
        numbers[3],
        numbers[4] * 256 + numbers[5]
    );
    addr.parse().unwrap()
}

#[tokio::test]
async fn test_anonymous_download_session() {
    let root = setup_tree();
    let server = start_server(&root, 10).await;
    let mut client = Client::logged_in(server.local_addr()).await;

    assert_eq!(client.command("SYST").await.0, 215);
    assert_eq!(client.command("TYPE I").await.0, 200);

    let listing = client.passive_transfer("LIST").await;
    let listing = String::from_utf8(listing).unwrap();
    assert!(listing.contains("readme.txt"));
    assert!(listing.contains("pub"));
    assert!(listing.lines().all(|line| !line.is_empty()));

    let received = client.passive_transfer("RETR readme.txt").await;
    assert_eq!(received, README);

    let (code, _) = client.command("SIZE /readme.txt").await;
    assert_eq!(code, 213);

    let (code, _) = client.command("QUIT").await;
    assert_eq!(code, 221);
    assert!(client.is_closed().await);

    wait_for_sessions(&server, 0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_binary_retr_in_subdirectory_with_restart() {
    let root = setup_tree();
    let server = start_server(&root, 10).await;
    let mut client = Client::logged_in(server.local_addr()).await;

    assert_eq!(client.command("TYPE I").await.0, 200);
    assert_eq!(client.command("CWD pub").await.0, 250);
    let (code, text) = client.command("PWD").await;
    assert_eq!(code, 257);
    assert!(text.contains("\"/pub\""));

    let received = client.passive_transfer("RETR data.bin").await;
    assert_eq!(received, [0u8, 1, 2, 13, 10, 255]);

    assert_eq!(client.command("REST 3").await.0, 350);
    let received = client.passive_transfer("RETR data.bin").await;
    assert_eq!(received, [13u8, 10, 255]);

    // The offset applies to one transfer only.
    let received = client.passive_transfer("RETR /pub/data.bin").await;
    assert_eq!(received.len(), 6);

    assert_eq!(client.command("QUIT").await.0, 221);
    server.stop().await;
}

#[tokio::test]
async fn test_ascii_retr_converts_line_endings() {
    let root = setup_tree();
    let server = start_server(&root, 10).await;
    let mut client = Client::logged_in(server.local_addr()).await;

    let received = client.passive_transfer("RETR readme.txt").await;
    assert_eq!(
        received,
        b"Welcome to the archive.\r\nNothing to see here.\r\n".to_vec()
    );

    assert_eq!(client.command("QUIT").await.0, 221);
    server.stop().await;
}

#[tokio::test]
async fn test_cwd_cannot_escape_root() {
    let root = setup_tree();
    let server = start_server(&root, 10).await;
    let mut client = Client::logged_in(server.local_addr()).await;

    assert_eq!(client.command("CWD pub").await.0, 250);
    let (code, _) = client.command("CWD ../../etc").await;
    assert_eq!(code, 550);
    let (_, text) = client.command("PWD").await;
    assert!(text.contains("\"/pub\""), "{}", text);

    assert_eq!(client.command("CDUP").await.0, 250);
    assert_eq!(client.command("CDUP").await.0, 550);
    let (_, text) = client.command("PWD").await;
    assert!(text.contains("\"/\""), "{}", text);

    assert_eq!(client.command("SIZE ../readme.txt").await.0, 550);
    assert_eq!(client.command("RETR /../../etc/passwd").await.0, 550);

    assert_eq!(client.command("QUIT").await.0, 221);
    server.stop().await;
}

#[tokio::test]
async fn test_login_required_and_unknown_commands() {
    let root = setup_tree();
    let server = start_server(&root, 10).await;
    let mut client = Client::greeted(server.local_addr()).await;

    assert_eq!(client.command("PWD").await.0, 530);
    assert_eq!(client.command("LIST").await.0, 530);
    assert_eq!(client.command("NOOP").await.0, 200);
    assert_eq!(client.command("XYZZY plugh").await.0, 502);
    assert_eq!(client.command("PASS nobody").await.0, 503);
    assert_eq!(client.command("USER root").await.0, 530);
    assert_eq!(client.command("PWD").await.0, 530);

    assert_eq!(client.command("user ftp").await.0, 331);
    assert_eq!(client.command("pass").await.0, 230);
    assert_eq!(client.command("PASS again").await.0, 503);
    assert_eq!(client.command("XYZZY").await.0, 502);
    assert_eq!(client.command("PWD").await.0, 257);

    assert_eq!(client.command("QUIT").await.0, 221);
    server.stop().await;
}

#[tokio::test]
async fn test_write_commands_are_refused() {
    let root = setup_tree();
    let server = start_server(&root, 10).await;
    let mut client = Client::greeted(server.local_addr()).await;

    assert_eq!(client.command("STOR upload.txt").await.0, 550);

    client.send("USER anonymous").await;
    client.read_reply().await;
    client.send("PASS x").await;
    client.read_reply().await;

    for line in [
        "STOR upload.txt",
        "APPE readme.txt",
        "STOU",
        "DELE readme.txt",
        "RNFR readme.txt",
        "RNTO stolen.txt",
        "MKD newdir",
        "XMKD newdir",
        "RMD pub",
        "XRMD pub",
        "SITE CHMOD 777 readme.txt",
        "ALLO 1024",
    ] {
        let (code, _) = client.command(line).await;
        assert_eq!(code, 550, "{} was not refused", line);
    }

    assert_eq!(fs::read(root.path().join("readme.txt")).unwrap(), README);
    assert!(root.path().join("pub").is_dir());
    assert!(!root.path().join("newdir").exists());
    assert!(!root.path().join("upload.txt").exists());
    assert!(!root.path().join("stolen.txt").exists());

    assert_eq!(client.command("QUIT").await.0, 221);
    server.stop().await;
}

#[tokio::test]
async fn test_transfer_without_data_channel() {
    let root = setup_tree();
    let server = start_server(&root, 10).await;
    let mut client = Client::logged_in(server.local_addr()).await;

    assert_eq!(client.command("RETR readme.txt").await.0, 425);
    assert_eq!(client.command("LIST").await.0, 425);

    // A missing file consumes the pending channel without a transfer.
    client.pasv().await;
    assert_eq!(client.command("RETR missing.txt").await.0, 550);
    assert_eq!(client.command("RETR readme.txt").await.0, 425);

    assert_eq!(client.command("QUIT").await.0, 221);
    server.stop().await;
}

#[tokio::test]
async fn test_active_mode_listing() {
    let root = setup_tree();
    let server = start_server(&root, 10).await;
    let mut client = Client::logged_in(server.local_addr()).await;

    let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = data_listener.local_addr().unwrap().port();

    // Bounce attempts to other hosts are refused.
    let (code, _) = client
        .command(&format!("PORT 10,0,0,1,{},{}", port >> 8, port & 0xff))
        .await;
    assert_eq!(code, 501);

    let (code, _) = client
        .command(&format!("PORT 127,0,0,1,{},{}", port >> 8, port & 0xff))
        .await;
    assert_eq!(code, 200);

    client.send("NLST").await;
    let (mut data, _) = timeout(WAIT, data_listener.accept())
        .await
        .unwrap()
        .unwrap();
    let mut received = Vec::new();
    data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"pub\r\nreadme.txt\r\n".to_vec());

    assert_eq!(client.read_reply().await.0, 150);
    assert_eq!(client.read_reply().await.0, 226);

    assert_eq!(client.command("QUIT").await.0, 221);
    server.stop().await;
}

#[tokio::test]
async fn test_connection_ceiling() {
    let root = setup_tree();
    let server = start_server(&root, 1).await;

    let mut first = Client::greeted(server.local_addr()).await;
    wait_for_sessions(&server, 1).await;

    let mut second = Client::connect(server.local_addr()).await;
    let (code, _) = second.read_reply().await;
    assert_eq!(code, 421);
    assert!(second.is_closed().await);

    // The rejected client did not disturb the admitted one.
    assert_eq!(first.command("NOOP").await.0, 200);
    assert_eq!(first.command("QUIT").await.0, 221);
    wait_for_sessions(&server, 0).await;

    let mut third = Client::greeted(server.local_addr()).await;
    assert_eq!(third.command("QUIT").await.0, 221);
    server.stop().await;
}

#[tokio::test]
async fn test_idle_session_is_closed() {
    let root = setup_tree();
    let server = start(test_config(&root, 5, Duration::from_secs(1))).await;

    let mut client = Client::logged_in(server.local_addr()).await;
    wait_for_sessions(&server, 1).await;

    let (code, text) = client.read_reply().await;
    assert_eq!(code, 421);
    assert!(text.contains("Idle timeout"), "{}", text);
    assert!(client.is_closed().await);

    wait_for_sessions(&server, 0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_oversized_command_line_ends_session() {
    let root = setup_tree();
    let server = start_server(&root, 5).await;
    let mut client = Client::greeted(server.local_addr()).await;

    // Over the limit and no terminator, sized so the server has read
    // everything sent before it hangs up.
    let line = "a".repeat(MAX_COMMAND_LINE + 2);
    client.writer.write_all(line.as_bytes()).await.unwrap();
    let (code, _) = client.read_reply().await;
    assert_eq!(code, 500);
    assert!(client.is_closed().await);

    wait_for_sessions(&server, 0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_stop_waits_for_live_sessions() {
    let root = setup_tree();
    let server = start_server(&root, 5).await;
    let addr = server.local_addr();
    let mut client = Client::logged_in(addr).await;
    wait_for_sessions(&server, 1).await;

    let stopping = tokio::spawn(server.stop());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!stopping.is_finished());

    // Existing sessions keep being served while draining.
    assert_eq!(client.command("PWD").await.0, 257);
    assert_eq!(client.command("QUIT").await.0, 221);

    timeout(WAIT, stopping).await.unwrap().unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_command_line_at_length_limit() {
    let root = setup_tree();
    let server = start_server(&root, 5).await;
    let mut client = Client::greeted(server.local_addr()).await;

    let line = format!("NOOP {}", "x".repeat(MAX_COMMAND_LINE - 5));
    assert_eq!(line.len(), MAX_COMMAND_LINE);

    // CRLF terminated.
    assert_eq!(client.command(&line).await.0, 200);

    // Bare LF terminated.
    client
        .writer
        .write_all(format!("{}\n", line).as_bytes())
        .await
        .unwrap();
    assert_eq!(client.read_reply().await.0, 200);

    // One byte more is refused and ends the session.
    client
        .writer
        .write_all(format!("{}x\n", line).as_bytes())
        .await
        .unwrap();
    assert_eq!(client.read_reply().await.0, 500);
    assert!(client.is_closed().await);

    wait_for_sessions(&server, 0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_idle_timeout_while_waiting_for_data_connection() {
    let root = setup_tree();
    let mut config = test_config(&root, 5, Duration::from_secs(1));
    config.data_timeout = Duration::from_secs(30);
    let server = start(config).await;

    let mut client = Client::logged_in(server.local_addr()).await;
    client.pasv().await;

    // Never connect to the passive port: the idle timeout fires long
    // before the data connection wait would.
    client.send("RETR readme.txt").await;
    let (code, text) = client.read_reply().await;
    assert_eq!(code, 421);
    assert!(text.contains("Idle timeout"), "{}", text);
    assert!(client.is_closed().await);

    wait_for_sessions(&server, 0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_symlink_out_of_root_is_refused() {
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret"), b"top secret").unwrap();
    let root = setup_tree();
    std::os::unix::fs::symlink(outside.path(), root.path().join("escape")).unwrap();

    let server = start_server(&root, 5).await;
    let mut client = Client::logged_in(server.local_addr()).await;

    client.pasv().await;
    assert_eq!(client.command("RETR escape/secret").await.0, 550);
    assert_eq!(client.command("SIZE escape/secret").await.0, 550);
    assert_eq!(client.command("CWD escape").await.0, 550);
    client.pasv().await;
    assert_eq!(client.command("LIST escape").await.0, 550);

    let (_, text) = client.command("PWD").await;
    assert!(text.contains("\"/\""), "{}", text);

    // The link itself still shows up in the listing of the root.
    let listing = client.passive_transfer("NLST").await;
    assert!(String::from_utf8(listing).unwrap().contains("escape"));

    assert_eq!(client.command("QUIT").await.0, 221);
    server.stop().await;
}
