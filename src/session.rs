use log::{debug, error, info};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::config::SharedConfig;
use crate::constants::{COMMAND_BUFFERSIZE, RESPONSE_BUFFERSIZE};
use crate::core_buffer::RingBuffer;
use crate::core_path;
use crate::core_transfer::{MlstFacts, Transfer};
use crate::server::ServerState;

/// Where the session currently is in the command/data life cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// Waiting for a command on the control connection.
    Command,
    /// A transfer was armed and the data connection is being established.
    DataConnect,
    /// Bytes are moving on the data channel.
    DataTransfer,
}

/// The one data-channel slot a session owns. PASV and PORT arm it, the
/// first transfer step turns an armed slot into a live stream, and MLST and
/// STAT replies borrow the control socket instead of opening a second one.
pub enum DataChannel {
    None,
    PasvListener(TcpListener),
    PortAddr(SocketAddr),
    Stream(TcpStream),
    Control,
}

impl DataChannel {
    /// True while PASV or PORT has set up a pending data connection.
    pub fn is_armed(&self) -> bool {
        matches!(self, DataChannel::PasvListener(_) | DataChannel::PortAddr(_))
    }
}

/// Per-client protocol state. Owned by the driver task for its whole life;
/// nothing outside that task touches it.
pub struct Session {
    pub config: SharedConfig,
    pub server: Arc<ServerState>,

    pub control_rd: OwnedReadHalf,
    pub control_wr: OwnedWriteHalf,
    pub peer_addr: SocketAddr,
    pub local_addr: SocketAddr,

    pub state: SessionState,
    pub command_buffer: RingBuffer,
    pub response_buffer: RingBuffer,

    pub authorized_user: bool,
    pub authorized_pass: bool,

    /// Canonical current directory: absolute, no `.`/`..`, single slashes.
    pub cwd: String,
    /// Last listed directory; NLST builds full names against it.
    pub lwd: String,
    /// Path captured by RNFR, consumed by the next RNTO.
    pub rename_from: Option<String>,
    /// Offset from REST, consumed by the next RETR/STOR/APPE.
    pub restart_position: u64,

    /// MODE Z toggle.
    pub deflate: bool,
    pub facts: MlstFacts,

    pub data: DataChannel,
    pub transfer: Option<Transfer>,

    /// Real directory the virtual namespace is rooted at.
    pub root: PathBuf,

    /// Set once the control connection should be torn down.
    pub closing: bool,
}

impl Session {
    pub async fn new(
        socket: TcpStream,
        config: SharedConfig,
        server: Arc<ServerState>,
    ) -> io::Result<Self> {
        let peer_addr = socket.peer_addr()?;
        let local_addr = socket.local_addr()?;
        let (control_rd, control_wr) = socket.into_split();

        let (authorized_user, authorized_pass, root) = {
            let config = config.lock().await;
            (
                config.user.is_empty(),
                config.pass.is_empty(),
                PathBuf::from(&config.root_dir),
            )
        };

        let mut session = Self {
            config,
            server,
            control_rd,
            control_wr,
            peer_addr,
            local_addr,
            state: SessionState::Command,
            command_buffer: RingBuffer::new(COMMAND_BUFFERSIZE),
            response_buffer: RingBuffer::new(RESPONSE_BUFFERSIZE),
            authorized_user,
            authorized_pass,
            cwd: String::from("/"),
            lwd: String::from("/"),
            rename_from: None,
            restart_position: 0,
            deflate: false,
            facts: MlstFacts::default(),
            data: DataChannel::None,
            transfer: None,
            root,
            closing: false,
        };

        session.send_response("220 Hello!\r\n");
        Ok(session)
    }

    pub fn authorized(&self) -> bool {
        self.authorized_user && self.authorized_pass
    }

    /// Stage a reply on the response buffer. A reply that does not fit is a
    /// handler defect and kills the session.
    pub fn send_response(&mut self, response: &str) {
        debug!("{} <- {}", self.peer_addr, response.trim_end());

        if !self.response_buffer.push(response.as_bytes()) {
            error!("Not enough space for response");
            self.closing = true;
        }
    }

    /// Drain the response buffer onto the control socket.
    pub async fn flush_responses(&mut self) -> io::Result<()> {
        while !self.response_buffer.is_empty() {
            let n = self.control_wr.write(self.response_buffer.used_area()).await?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "peer gone"));
            }
            self.response_buffer.mark_free(n);
        }
        Ok(())
    }

    /// The single state-transition primitive. Returning to COMMAND resets
    /// the restart offset and drops the transfer with its file, directory
    /// and compressor handles.
    pub fn set_state(&mut self, state: SessionState, close_pasv: bool, close_data: bool) {
        self.state = state;

        if close_pasv && self.data.is_armed() {
            self.data = DataChannel::None;
        }
        if close_data && matches!(self.data, DataChannel::Stream(_) | DataChannel::Control) {
            self.data = DataChannel::None;
        }

        if state == SessionState::Command {
            self.restart_position = 0;
            self.transfer = None;
        }
    }

    /// Map a virtual absolute path onto the configured root.
    pub fn real_path(&self, virtual_path: &str) -> PathBuf {
        core_path::real_path(&self.root, virtual_path)
    }

    pub async fn build_resolved_path(&self, args: &str) -> io::Result<String> {
        core_path::build_resolved_path(&self.root, &self.cwd, args).await
    }

    /// CWD/CDUP. `..` pops one component lexically; anything else resolves
    /// and must name a directory.
    pub async fn change_dir(&mut self, args: &str) -> io::Result<()> {
        if args == ".." {
            match self.cwd.rfind('/') {
                Some(0) | None => self.cwd = String::from("/"),
                Some(pos) => self.cwd.truncate(pos),
            }
            return Ok(());
        }

        let path = self.build_resolved_path(args).await?;
        let st = tokio::fs::metadata(self.real_path(&path)).await?;
        if !st.is_dir() {
            return Err(io::Error::new(io::ErrorKind::Other, "Not a directory"));
        }

        self.cwd = path;
        Ok(())
    }

    pub fn close_command(&mut self) {
        info!("Closing control connection for {}", self.peer_addr);
        self.closing = true;
    }

    #[cfg(test)]
    pub fn take_response(&mut self) -> String {
        let text = String::from_utf8_lossy(self.response_buffer.used_area()).into_owned();
        self.response_buffer.clear();
        text
    }
}
