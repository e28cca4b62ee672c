// End-to-end tests: a real listener, a real client socket, full command
// and data channel traffic through the session driver.

use std::io::{Read, Write as IoWrite};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::config::FtpConfig;
use crate::core_network::network::handle_connection;
use crate::server::ServerState;

const TICK: Duration = Duration::from_secs(10);

fn temp_root(tag: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("pocketftpd-e2e-{}-{}", tag, std::process::id()));
    std::fs::remove_dir_all(&path).ok();
    std::fs::create_dir_all(&path).unwrap();
    path
}

async fn start_test_server(root: &Path) -> SocketAddr {
    let mut config = FtpConfig::default();
    config.root_dir = root.to_string_lossy().into_owned();

    let shared = Arc::new(tokio::sync::Mutex::new(config));
    let state = ServerState::new(root.to_path_buf());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let config = Arc::clone(&shared);
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                handle_connection(socket, config, state).await.ok();
            });
        }
    });

    addr
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (rd, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(rd),
            writer,
        };
        let banner = client.reply().await;
        assert!(banner.starts_with("220 "), "{banner}");
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn reply(&mut self) -> String {
        let mut line = String::new();
        timeout(TICK, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        line
    }

    async fn command(&mut self, line: &str) -> String {
        self.send(line).await;
        self.reply().await
    }

    async fn login(&mut self) {
        assert!(self.command("USER anonymous").await.starts_with("230 "));
        assert!(self.command("PASS x@x").await.starts_with("230 "));
    }

    /// Issue PASV and connect to the advertised address.
    async fn pasv(&mut self) -> TcpStream {
        let reply = self.command("PASV").await;
        assert!(reply.starts_with("227 "), "{reply}");

        let inside = reply
            .split('(')
            .nth(1)
            .and_then(|s| s.split(')').next())
            .expect("malformed 227");
        let fields: Vec<u16> = inside.split(',').map(|f| f.parse().unwrap()).collect();
        assert_eq!(fields.len(), 6);

        let addr = format!(
            "{}.{}.{}.{}:{}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            fields[4] * 256 + fields[5]
        );
        timeout(TICK, TcpStream::connect(addr))
            .await
            .expect("timed out connecting to PASV port")
            .unwrap()
    }
}

async fn read_to_end(mut stream: TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    timeout(TICK, stream.read_to_end(&mut data))
        .await
        .expect("timed out draining data channel")
        .unwrap();
    data
}

fn deflate_bytes(payload: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(6));
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

fn inflate_bytes(wire: &[u8]) -> Vec<u8> {
    let mut decoder = flate2::read::ZlibDecoder::new(wire);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    out
}

#[tokio::test]
async fn test_anonymous_listing() {
    let root = temp_root("listing");
    std::fs::write(root.join("hello.txt"), b"hi there").unwrap();
    std::fs::create_dir(root.join("sub")).unwrap();

    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    let data = client.pasv().await;
    client.send("LIST").await;
    assert!(client.reply().await.starts_with("150 "));

    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert!(client.reply().await.starts_with("226 "));

    assert!(listing.contains("hello.txt\r\n"), "{listing}");
    assert!(listing.contains("sub\r\n"));
    // ls -l shape: type+mode, links, uid, gid, size
    assert!(listing.lines().any(|l| l.starts_with("-rw")), "{listing}");
    assert!(listing.lines().any(|l| l.starts_with('d')), "{listing}");
}

#[tokio::test]
async fn test_nlst_full_paths() {
    let root = temp_root("nlst");
    std::fs::create_dir(root.join("docs")).unwrap();
    std::fs::write(root.join("docs/a.txt"), b"a").unwrap();

    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;
    assert!(client.command("CWD docs").await.starts_with("200 "));

    let data = client.pasv().await;
    client.send("NLST").await;
    assert!(client.reply().await.starts_with("150 "));
    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert!(client.reply().await.starts_with("226 "));

    assert_eq!(listing, "/docs/a.txt\r\n");
}

#[tokio::test]
async fn test_retr_with_restart() {
    let root = temp_root("rest");
    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(root.join("data.bin"), &payload).unwrap();

    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;
    assert!(client.command("TYPE I").await.starts_with("200 "));

    let data = client.pasv().await;
    assert_eq!(client.command("REST 1024").await, "350 OK\r\n");
    client.send("RETR /data.bin").await;
    assert!(client.reply().await.starts_with("150 "));
    let body = read_to_end(data).await;
    assert!(client.reply().await.starts_with("226 "));
    assert_eq!(body, &payload[1024..]);

    // the offset was consumed; the next RETR starts from zero
    let data = client.pasv().await;
    client.send("RETR /data.bin").await;
    assert!(client.reply().await.starts_with("150 "));
    let body = read_to_end(data).await;
    assert!(client.reply().await.starts_with("226 "));
    assert_eq!(body, payload);
}

#[tokio::test]
async fn test_stor_roundtrip() {
    let root = temp_root("stor");
    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    let mut data = client.pasv().await;
    client.send("STOR /up.bin").await;
    assert!(client.reply().await.starts_with("150 "));

    let payload = vec![42u8; 100_000];
    data.write_all(&payload).await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);

    assert!(client.reply().await.starts_with("226 "));
    assert_eq!(std::fs::read(root.join("up.bin")).unwrap(), payload);

    // APPE extends in place
    let mut data = client.pasv().await;
    client.send("APPE /up.bin").await;
    assert!(client.reply().await.starts_with("150 "));
    data.write_all(b"tail").await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    assert!(client.reply().await.starts_with("226 "));
    assert_eq!(
        std::fs::read(root.join("up.bin")).unwrap().len(),
        payload.len() + 4
    );
}

#[tokio::test]
async fn test_mode_z_roundtrip() {
    let root = temp_root("modez");
    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    assert!(client.command("MODE Z").await.starts_with("200 "));

    // compressed upload is inflated on arrival
    let mut data = client.pasv().await;
    client.send("STOR /up.bin").await;
    assert!(client.reply().await.starts_with("150 "));
    data.write_all(&deflate_bytes(b"hello world")).await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    assert!(client.reply().await.starts_with("226 "));
    assert_eq!(std::fs::read(root.join("up.bin")).unwrap(), b"hello world");

    // compressed download round-trips
    let data = client.pasv().await;
    client.send("RETR /up.bin").await;
    assert!(client.reply().await.starts_with("150 "));
    let wire = read_to_end(data).await;
    assert!(client.reply().await.starts_with("226 "));
    assert_eq!(inflate_bytes(&wire), b"hello world");

    // back to stream mode the same file arrives plain
    assert!(client.command("MODE S").await.starts_with("200 "));
    let data = client.pasv().await;
    client.send("RETR /up.bin").await;
    assert!(client.reply().await.starts_with("150 "));
    let plain = read_to_end(data).await;
    assert!(client.reply().await.starts_with("226 "));
    assert_eq!(plain, b"hello world");
}

#[tokio::test]
async fn test_mlsd_facts() {
    use std::os::unix::fs::PermissionsExt;

    let root = temp_root("mlsd");
    std::fs::write(root.join("x"), vec![7u8; 1024]).unwrap();
    std::fs::set_permissions(root.join("x"), std::fs::Permissions::from_mode(0o644)).unwrap();

    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    let data = client.pasv().await;
    client.send("MLSD /").await;
    assert!(client.reply().await.starts_with("150 "));
    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert!(client.reply().await.starts_with("226 "));

    let line = listing
        .lines()
        .find(|l| l.ends_with(" x"))
        .unwrap_or_else(|| panic!("no entry for x in {listing:?}"));
    assert!(line.contains("Type=file;"), "{line}");
    assert!(line.contains("Size=1024;"), "{line}");
    assert!(line.contains("Perm=adfrw;"), "{line}");
    assert!(line.contains("Modify="), "{line}");

    // the listed directory leads as cdir
    assert!(listing.starts_with("Type=cdir;"), "{listing}");
}

#[tokio::test]
async fn test_abor_mid_transfer() {
    let root = temp_root("abor");
    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    let mut data = client.pasv().await;
    client.send("RETR /devZero").await;
    assert!(client.reply().await.starts_with("150 "));

    // take a little of the endless stream, then abort past it
    let mut chunk = [0u8; 4096];
    timeout(TICK, data.read_exact(&mut chunk)).await.unwrap().unwrap();
    assert!(chunk.iter().all(|&b| b == 0));

    client
        .writer
        .write_all(&[0xF4, 0xF2, b'A', b'B', b'O', b'R', b'\r', b'\n'])
        .await
        .unwrap();

    assert_eq!(client.reply().await, "225 Aborted\r\n");
    assert_eq!(client.reply().await, "426 Transfer aborted\r\n");

    // the data socket dies, the control channel lives on
    let mut rest = Vec::new();
    timeout(TICK, data.read_to_end(&mut rest)).await.unwrap().ok();
    assert_eq!(client.command("PWD").await, "257 \"/\"\r\n");
}

#[tokio::test]
async fn test_command_during_transfer_aborts() {
    let root = temp_root("during");
    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    let data = client.pasv().await;
    client.send("RETR /devZero").await;
    assert!(client.reply().await.starts_with("150 "));

    let reply = client.command("CWD /").await;
    assert_eq!(reply, "503 Invalid command during transfer\r\n");
    drop(data);

    // the control connection survives the aborted transfer
    assert_eq!(client.command("NOOP").await, "200 OK\r\n");
}

#[tokio::test]
async fn test_stat_inline_listing() {
    let root = temp_root("stat-inline");
    std::fs::write(root.join("y.txt"), b"12345").unwrap();

    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    client.send("STAT /y.txt").await;
    assert_eq!(client.reply().await, "250-Status\r\n");

    let mut lines = Vec::new();
    loop {
        let line = client.reply().await;
        let done = line.starts_with("250 ");
        lines.push(line);
        if done {
            break;
        }
    }

    assert!(lines.iter().any(|l| l.contains("y.txt")), "{lines:?}");
    assert_eq!(lines.last().unwrap(), "250 OK\r\n");
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_closes_session() {
    let root = temp_root("idle");
    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;

    // send nothing further; the only pending timer is the server's idle
    // sweep, so the paused clock jumps straight to it
    let mut line = String::new();
    let n = client.reader.read_line(&mut line).await.unwrap();
    assert_eq!(n, 0, "expected the idle sweep to close the connection");
}

#[tokio::test]
async fn test_command_buffer_overflow_closes() {
    let root = temp_root("overflow");
    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;

    // a "line" longer than the command buffer is a protocol error
    let junk = vec![b'A'; 8192];
    client.writer.write_all(&junk).await.ok();

    // the server drops the connection; EOF or a reset both count
    let mut rest = Vec::new();
    match timeout(TICK, client.reader.read_to_end(&mut rest))
        .await
        .expect("timed out waiting for close")
    {
        Ok(n) => assert_eq!(n, 0),
        Err(_) => {}
    }
}

#[tokio::test]
async fn test_active_mode_retr() {
    let root = temp_root("active");
    std::fs::write(root.join("f.bin"), b"active mode payload").unwrap();

    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    // the client listens and the server connects back
    let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let data_port = data_listener.local_addr().unwrap().port();
    let port_arg = format!("127,0,0,1,{},{}", data_port >> 8, data_port & 0xFF);

    assert_eq!(client.command(&format!("PORT {}", port_arg)).await, "200 OK\r\n");

    client.send("RETR /f.bin").await;
    let (data, _) = timeout(TICK, data_listener.accept()).await.unwrap().unwrap();
    assert!(client.reply().await.starts_with("150 "));

    let body = read_to_end(data).await;
    assert!(client.reply().await.starts_with("226 "));
    assert_eq!(body, b"active mode payload");
}

#[tokio::test]
async fn test_nlst_glob() {
    let root = temp_root("glob");
    std::fs::write(root.join("a.log"), b"a").unwrap();
    std::fs::write(root.join("b.log"), b"b").unwrap();
    std::fs::write(root.join("c.txt"), b"c").unwrap();

    let addr = start_test_server(&root).await;
    let mut client = Client::connect(addr).await;
    client.login().await;

    let data = client.pasv().await;
    client.send("NLST *.log").await;
    assert!(client.reply().await.starts_with("150 "));
    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert!(client.reply().await.starts_with("226 "));

    let mut names: Vec<&str> = listing.lines().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["/a.log", "/b.log"]);
}
