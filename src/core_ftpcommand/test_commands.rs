// Session-level tests: handlers run against a real socket pair and a
// scratch directory, with replies read back off the response buffer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

use crate::config::FtpConfig;
use crate::core_ftpcommand::handlers::dispatch;
use crate::server::ServerState;
use crate::session::{DataChannel, Session, SessionState};

fn temp_root(tag: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("pocketftpd-{}-{}", tag, std::process::id()));
    std::fs::remove_dir_all(&path).ok();
    std::fs::create_dir_all(&path).unwrap();
    path
}

async fn test_session(root: &Path, config: FtpConfig) -> (Session, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server_side, _) = listener.accept().await.unwrap();

    let mut config = config;
    config.root_dir = root.to_string_lossy().into_owned();

    let shared = Arc::new(tokio::sync::Mutex::new(config));
    let state = ServerState::new(root.to_path_buf());

    let mut session = Session::new(server_side, shared, state).await.unwrap();
    assert!(session.take_response().starts_with("220 "));
    (session, client)
}

async fn anonymous_session(root: &Path) -> (Session, TcpStream) {
    test_session(root, FtpConfig::default()).await
}

#[tokio::test]
async fn test_anonymous_login() {
    let root = temp_root("anon-login");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "USER anonymous").await.unwrap();
    assert_eq!(session.take_response(), "230 OK\r\n");

    dispatch(&mut session, "PASS x@x").await.unwrap();
    assert_eq!(session.take_response(), "230 OK\r\n");

    assert!(session.authorized());
}

#[tokio::test]
async fn test_configured_login_order() {
    let root = temp_root("login-order");
    let mut config = FtpConfig::default();
    config.user = String::from("carol");
    config.pass = String::from("secret");
    let (mut session, _client) = test_session(&root, config).await;

    // PASS before USER is refused
    dispatch(&mut session, "PASS secret").await.unwrap();
    assert_eq!(session.take_response(), "430 User not authorized\r\n");
    assert!(!session.authorized());

    dispatch(&mut session, "USER mallory").await.unwrap();
    assert_eq!(session.take_response(), "430 Invalid user\r\n");

    dispatch(&mut session, "USER carol").await.unwrap();
    assert_eq!(session.take_response(), "331 Need password\r\n");

    dispatch(&mut session, "PASS wrong").await.unwrap();
    assert_eq!(session.take_response(), "430 Invalid password\r\n");
    assert!(!session.authorized());

    dispatch(&mut session, "PASS secret").await.unwrap();
    assert_eq!(session.take_response(), "230 OK\r\n");
    assert!(session.authorized());
}

#[tokio::test]
async fn test_unauthorized_commands_gated() {
    let root = temp_root("gated");
    let mut config = FtpConfig::default();
    config.user = String::from("carol");
    let (mut session, _client) = test_session(&root, config).await;

    for line in ["LIST", "PWD", "SIZE /x", "PASV", "RETR /x"] {
        dispatch(&mut session, line).await.unwrap();
        assert_eq!(session.take_response(), "530 Not logged in\r\n", "{line}");
    }
}

#[tokio::test]
async fn test_unknown_command() {
    let root = temp_root("unknown");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "XYZZY plugh").await.unwrap();
    assert_eq!(
        session.take_response(),
        "502 Invalid command \"XYZZY plugh\"\r\n"
    );
}

#[tokio::test]
async fn test_pwd_quoting() {
    let root = temp_root("pwd");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "PWD").await.unwrap();
    assert_eq!(session.take_response(), "257 \"/\"\r\n");

    session.cwd = String::from("/a\"b");
    dispatch(&mut session, "XPWD").await.unwrap();
    assert_eq!(session.take_response(), "257 \"/a\"\"b\"\r\n");
}

#[tokio::test]
async fn test_cwd_and_cdup() {
    let root = temp_root("cwd");
    std::fs::create_dir_all(root.join("music/album")).unwrap();
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "CWD music").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert_eq!(session.cwd, "/music");

    dispatch(&mut session, "CWD album").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert_eq!(session.cwd, "/music/album");

    dispatch(&mut session, "CDUP").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert_eq!(session.cwd, "/music");

    dispatch(&mut session, "CWD /nope").await.unwrap();
    assert!(session.take_response().starts_with("550 "));
    assert_eq!(session.cwd, "/music");

    // popping above the root stops at /
    dispatch(&mut session, "CDUP").await.unwrap();
    session.take_response();
    dispatch(&mut session, "CDUP").await.unwrap();
    session.take_response();
    assert_eq!(session.cwd, "/");
}

#[tokio::test]
async fn test_mkd_dele_rmd() {
    let root = temp_root("mkd");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "MKD stuff").await.unwrap();
    assert_eq!(session.take_response(), "250 OK\r\n");
    assert!(root.join("stuff").is_dir());

    std::fs::write(root.join("stuff/junk.txt"), b"junk").unwrap();
    dispatch(&mut session, "DELE /stuff/junk.txt").await.unwrap();
    assert_eq!(session.take_response(), "250 OK\r\n");
    assert!(!root.join("stuff/junk.txt").exists());

    dispatch(&mut session, "RMD stuff").await.unwrap();
    assert_eq!(session.take_response(), "250 OK\r\n");
    assert!(!root.join("stuff").exists());

    dispatch(&mut session, "RMD stuff").await.unwrap();
    assert!(session.take_response().starts_with("550 "));
}

#[tokio::test]
async fn test_rename_staging() {
    let root = temp_root("rename");
    std::fs::write(root.join("a.txt"), b"payload").unwrap();
    let (mut session, _client) = anonymous_session(&root).await;

    // RNTO without RNFR
    dispatch(&mut session, "RNTO /b.txt").await.unwrap();
    assert_eq!(session.take_response(), "503 Bad sequence of commands\r\n");

    // an intervening command clears the staged source
    dispatch(&mut session, "RNFR /a.txt").await.unwrap();
    assert_eq!(session.take_response(), "350 OK\r\n");
    dispatch(&mut session, "NOOP").await.unwrap();
    session.take_response();
    dispatch(&mut session, "RNTO /b.txt").await.unwrap();
    assert_eq!(session.take_response(), "503 Bad sequence of commands\r\n");

    dispatch(&mut session, "RNFR /a.txt").await.unwrap();
    assert_eq!(session.take_response(), "350 OK\r\n");
    dispatch(&mut session, "RNTO /b.txt").await.unwrap();
    assert_eq!(session.take_response(), "250 OK\r\n");

    dispatch(&mut session, "SIZE /a.txt").await.unwrap();
    assert!(session.take_response().starts_with("550 "));
    dispatch(&mut session, "SIZE /b.txt").await.unwrap();
    assert_eq!(session.take_response(), "213 7\r\n");

    dispatch(&mut session, "RNFR /missing").await.unwrap();
    assert!(session.take_response().starts_with("450 "));
}

#[tokio::test]
async fn test_size_on_directory() {
    let root = temp_root("size-dir");
    std::fs::create_dir_all(root.join("d")).unwrap();
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "SIZE /d").await.unwrap();
    assert_eq!(session.take_response(), "550 Not a file\r\n");
}

#[tokio::test]
async fn test_rest_parsing() {
    let root = temp_root("rest");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "REST 524288").await.unwrap();
    assert_eq!(session.take_response(), "350 OK\r\n");
    assert_eq!(session.restart_position, 524288);

    dispatch(&mut session, "REST -1").await.unwrap();
    assert_eq!(session.take_response(), "504 Invalid argument\r\n");

    dispatch(&mut session, "REST 18446744073709551616").await.unwrap();
    assert_eq!(session.take_response(), "504 Invalid argument\r\n");

    // any return to COMMAND clears a pending offset
    dispatch(&mut session, "REST 77").await.unwrap();
    session.take_response();
    session.set_state(SessionState::Command, false, false);
    assert_eq!(session.restart_position, 0);
}

#[tokio::test]
async fn test_type_stru_mode() {
    let root = temp_root("tsm");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "TYPE I").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    dispatch(&mut session, "TYPE A").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");

    dispatch(&mut session, "STRU F").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    dispatch(&mut session, "STRU R").await.unwrap();
    assert_eq!(session.take_response(), "504 Unavailable\r\n");

    dispatch(&mut session, "MODE Z").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert!(session.deflate);
    dispatch(&mut session, "MODE S").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert!(!session.deflate);
    dispatch(&mut session, "MODE B").await.unwrap();
    assert_eq!(session.take_response(), "504 Unavailable\r\n");
}

#[tokio::test]
async fn test_feat_reflects_facts() {
    let root = temp_root("feat");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "FEAT").await.unwrap();
    let response = session.take_response();
    assert!(response.starts_with("211-"));
    assert!(response.contains(" MLST Type*;Size*;Modify*;Perm*;UNIX.mode;\r\n"));
    assert!(response.contains(" MODE Z\r\n"));
    assert!(response.ends_with("211 End\r\n"));
}

#[tokio::test]
async fn test_opts_mlst_facts() {
    let root = temp_root("opts");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "OPTS MLST Type;UNIX.mode;").await.unwrap();
    assert_eq!(session.take_response(), "200 MLST OPTS Type;UNIX.mode;\r\n");
    assert!(session.facts.ty);
    assert!(session.facts.unix_mode);
    assert!(!session.facts.size);
    assert!(!session.facts.modify);
    assert!(!session.facts.perm);

    dispatch(&mut session, "OPTS MLST ").await.unwrap();
    assert_eq!(session.take_response(), "200 MLST OPTS\r\n");

    dispatch(&mut session, "OPTS UTF8 ON").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");

    dispatch(&mut session, "OPTS NONSENSE").await.unwrap();
    assert_eq!(session.take_response(), "504 Invalid argument\r\n");
}

#[tokio::test]
async fn test_opts_mode_z_level() {
    let root = temp_root("opts-z");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "OPTS MODE Z LEVEL 8").await.unwrap();
    assert_eq!(session.take_response(), "200 MODE Z LEVEL set to 8\r\n");
    assert_eq!(session.config.lock().await.deflate_level, 8);

    dispatch(&mut session, "OPTS MODE Z LEVEL 42").await.unwrap();
    assert_eq!(session.take_response(), "501 Invalid argument\r\n");

    dispatch(&mut session, "OPTS MODE Z BOGUS 1").await.unwrap();
    assert_eq!(session.take_response(), "501 Invalid argument\r\n");
}

#[tokio::test]
async fn test_site_subcommands() {
    let root = temp_root("site");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "SITE HELP").await.unwrap();
    let response = session.take_response();
    assert!(response.starts_with("211-"));
    assert!(response.contains("SITE DEFLATE"));

    dispatch(&mut session, "SITE DEFLATE 3").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert_eq!(session.config.lock().await.deflate_level, 3);

    dispatch(&mut session, "SITE DEFLATE 11").await.unwrap();
    assert_eq!(session.take_response(), "550 Invalid argument\r\n");

    dispatch(&mut session, "SITE USER carol").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert_eq!(session.config.lock().await.user, "carol");

    dispatch(&mut session, "SITE PORT 2121").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert_eq!(session.config.lock().await.port, 2121);

    dispatch(&mut session, "SITE FROBNICATE").await.unwrap();
    assert_eq!(session.take_response(), "550 Invalid command\r\n");
}

#[tokio::test]
async fn test_pasv_reply_format() {
    let root = temp_root("pasv");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "PASV").await.unwrap();
    let response = session.take_response();
    assert!(
        response.starts_with("227 Entering Passive Mode (127,0,0,1,"),
        "{response}"
    );
    assert!(response.ends_with(").\r\n"));
    assert!(session.data.is_armed());
}

#[tokio::test]
async fn test_port_arms_channel() {
    let root = temp_root("port");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "PORT 127,0,0,1,200,10").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert!(session.data.is_armed());
    match &session.data {
        DataChannel::PortAddr(addr) => assert_eq!(addr.to_string(), "127.0.0.1:51210"),
        _ => panic!("expected PortAddr"),
    }

    dispatch(&mut session, "PORT 1,2,3").await.unwrap();
    assert_eq!(session.take_response(), "501 Invalid argument\r\n");
    assert!(!session.data.is_armed());
}

#[tokio::test]
async fn test_transfer_starter_without_arming() {
    let root = temp_root("no-arming");
    std::fs::write(root.join("f.bin"), b"data").unwrap();
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "RETR /f.bin").await.unwrap();
    assert_eq!(session.take_response(), "503 Bad sequence of commands\r\n");
    assert_eq!(session.state, SessionState::Command);

    dispatch(&mut session, "LIST").await.unwrap();
    assert_eq!(session.take_response(), "503 Bad sequence of commands\r\n");
}

#[tokio::test]
async fn test_commands_rejected_during_transfer() {
    let root = temp_root("during-xfer");
    let (mut session, _client) = anonymous_session(&root).await;

    session.state = SessionState::DataTransfer;
    dispatch(&mut session, "CWD /").await.unwrap();
    assert_eq!(
        session.take_response(),
        "503 Invalid command during transfer\r\n"
    );
    assert_eq!(session.state, SessionState::Command);

    // the allowed set still answers
    session.state = SessionState::DataTransfer;
    dispatch(&mut session, "NOOP").await.unwrap();
    assert_eq!(session.take_response(), "200 OK\r\n");
    assert_eq!(session.state, SessionState::DataTransfer);
    session.state = SessionState::Command;
}

#[tokio::test]
async fn test_abor_without_transfer() {
    let root = temp_root("abor");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "ABOR").await.unwrap();
    assert_eq!(session.take_response(), "225 No transfer to abort\r\n");
}

#[tokio::test]
async fn test_stat_uptime() {
    let root = temp_root("stat");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "STAT").await.unwrap();
    let response = session.take_response();
    assert!(response.starts_with("211-FTP server status\r\n"));
    assert!(response.contains("Uptime: "));
    assert!(response.ends_with("211 End\r\n"));
}

#[tokio::test]
async fn test_syst_and_misc_replies() {
    let root = temp_root("misc");
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "SYST").await.unwrap();
    assert_eq!(session.take_response(), "215 UNIX Type: L8\r\n");

    dispatch(&mut session, "ALLO 100").await.unwrap();
    assert_eq!(session.take_response(), "202 Superfluous command\r\n");

    dispatch(&mut session, "STOU").await.unwrap();
    assert_eq!(session.take_response(), "502 Command not implemented\r\n");

    dispatch(&mut session, "MDTM /x").await.unwrap();
    assert_eq!(session.take_response(), "502 Command not implemented\r\n");

    dispatch(&mut session, "HELP").await.unwrap();
    assert!(session.take_response().starts_with("214-"));

    dispatch(&mut session, "QUIT").await.unwrap();
    assert_eq!(session.take_response(), "221 Disconnecting\r\n");
    assert!(session.closing);
}

#[tokio::test]
async fn test_mlst_inline_reply() {
    let root = temp_root("mlst");
    std::fs::write(root.join("x"), vec![0u8; 1024]).unwrap();
    let (mut session, _client) = anonymous_session(&root).await;

    dispatch(&mut session, "MLST /x").await.unwrap();
    assert_eq!(session.take_response(), "250-Status\r\n");
    assert_eq!(session.state, SessionState::DataTransfer);
    assert!(matches!(session.data, DataChannel::Control));

    let transfer = session.transfer.as_ref().unwrap();
    let staged = String::from_utf8_lossy(transfer.xfer_buffer.used_area()).into_owned();
    assert!(staged.starts_with(" Type=file;Size=1024;"), "{staged}");
    assert!(staged.ends_with(" /x\r\n"));
}
