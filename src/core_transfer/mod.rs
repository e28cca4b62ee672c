//! The data-transfer subsystem: arming RETR/STOR/APPE and the listing
//! family, plus the pump that moves bytes once the data channel is up.
//!
//! The pump is a tagged variant stepped by the session driver. Every step
//! does one bounded unit of work (produce one buffer, or push one buffer at
//! the socket) and comes back, so commands arriving on the control channel
//! are still seen while a transfer runs.

pub mod dirent;
pub mod zstream;

mod list;
mod retrieve;
mod store;

pub use dirent::{DirentInfo, MlstFacts, XferDirMode};

use chrono::Utc;
use log::{info, warn};
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;

use crate::constants::{DEVZERO_PATH, XFER_BUFFERSIZE};
use crate::core_buffer::RingBuffer;
use crate::core_path;
use crate::helpers::strerror;
use crate::session::{DataChannel, Session, SessionState};
use zstream::ZStream;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum XferFileMode {
    Retr,
    Stor,
    Appe,
}

/// What the active transfer is moving.
pub enum TransferKind {
    List {
        /// None once a single pre-filled entry (file argument, MLST) is all
        /// there is to send.
        dir: Option<tokio::fs::ReadDir>,
        mode: XferDirMode,
        lwd: String,
        facts: MlstFacts,
        root: PathBuf,
    },
    Glob {
        paths: glob::Paths,
        root: PathBuf,
    },
    Retrieve {
        /// None when the target is the zero sink.
        file: Option<tokio::fs::File>,
    },
    Store {
        file: Option<tokio::fs::File>,
    },
}

/// One in-flight transfer with its staging buffers and progress counters.
pub struct Transfer {
    pub kind: TransferKind,
    pub xfer_buffer: RingBuffer,
    pub zstream_buffer: RingBuffer,
    pub zstream: Option<ZStream>,
    pub deflate: bool,
    pub eof: bool,
    pub z_flushed: bool,
    pub file_position: u64,
    pub file_size: u64,
    pub zstream_position: u64,
    pub work_item: String,
}

impl Transfer {
    fn new(kind: TransferKind, deflate: bool, zstream: Option<ZStream>) -> Self {
        Self {
            kind,
            xfer_buffer: RingBuffer::new(XFER_BUFFERSIZE),
            zstream_buffer: RingBuffer::new(XFER_BUFFERSIZE),
            zstream,
            deflate,
            eof: false,
            z_flushed: false,
            file_position: 0,
            file_size: 0,
            zstream_position: 0,
            work_item: String::new(),
        }
    }

    /// The buffer new payload bytes go into: the pre-compression staging
    /// area under MODE Z, the wire buffer otherwise.
    fn io_buffer(&mut self) -> &mut RingBuffer {
        if self.deflate {
            &mut self.zstream_buffer
        } else {
            &mut self.xfer_buffer
        }
    }

    /// Run the compressor over the staging buffers. Errors carry the
    /// ready-to-send 501 reply.
    fn deflate_step(&mut self, finish: bool) -> Result<(), String> {
        let Some(z) = self.zstream.as_mut() else {
            return Ok(());
        };

        let before = self.xfer_buffer.used_size();
        match z.deflate_buffer(&mut self.zstream_buffer, &mut self.xfer_buffer, finish) {
            Ok(done) => {
                if done {
                    self.z_flushed = true;
                }
                self.zstream_position += (self.xfer_buffer.used_size() - before) as u64;
                Ok(())
            }
            Err(e) => Err(format!("501 {}\r\n", e)),
        }
    }

    fn inflate_step(&mut self) -> Result<(), String> {
        let Some(z) = self.zstream.as_mut() else {
            return Ok(());
        };

        let before = self.zstream_buffer.used_size();
        match z.inflate_buffer(&mut self.zstream_buffer, &mut self.xfer_buffer) {
            Ok(done) => {
                if done {
                    self.z_flushed = true;
                }
                self.zstream_position += (before - self.zstream_buffer.used_size()) as u64;
                Ok(())
            }
            Err(e) => Err(format!("501 {}\r\n", e)),
        }
    }
}

/// Outcome of one pump step.
pub enum StepResult {
    /// Progress was made; call again.
    Continue,
    /// The data connection is up; reply 150 and enter DATA_TRANSFER.
    Opened,
    /// The transfer is over; send the carried reply and return to COMMAND.
    Done(String),
}

/// The socket a pump writes to: a real data connection, or the control
/// socket when an MLST/STAT reply rides inline.
pub enum DataSocket<'a> {
    Stream(&'a mut TcpStream),
    Control(&'a mut OwnedWriteHalf),
}

impl DataSocket<'_> {
    pub async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            DataSocket::Stream(s) => s.write(buf).await,
            DataSocket::Control(w) => w.write(buf).await,
        }
    }

    pub async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            DataSocket::Stream(s) => s.read(buf).await,
            DataSocket::Control(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "control channel is write-only for transfers",
            )),
        }
    }
}

/// Write pending wire bytes out; shared tail of every sending pump.
async fn drain(transfer: &mut Transfer, socket: &mut DataSocket<'_>) -> StepResult {
    match socket.write(transfer.xfer_buffer.used_area()).await {
        Ok(0) | Err(_) => StepResult::Done(String::from("426 Connection broken during transfer\r\n")),
        Ok(n) => {
            transfer.xfer_buffer.mark_free(n);
            transfer.xfer_buffer.coalesce();
            StepResult::Continue
        }
    }
}

/// Drive the session's transfer one bounded step. Establishes the data
/// connection first when PASV/PORT is still pending.
pub async fn step(
    transfer: &mut Transfer,
    data: &mut DataChannel,
    control_wr: &mut OwnedWriteHalf,
) -> StepResult {
    match data {
        DataChannel::PasvListener(listener) => match listener.accept().await {
            Ok((stream, peer)) => {
                info!("Accepted data connection from {}", peer);
                *data = DataChannel::Stream(stream);
                StepResult::Opened
            }
            Err(e) => {
                warn!("Failed to accept data connection: {}", e);
                StepResult::Done(String::from("425 Failed to establish connection\r\n"))
            }
        },
        DataChannel::PortAddr(addr) => match TcpStream::connect(*addr).await {
            Ok(stream) => {
                info!("Connected to {}", addr);
                *data = DataChannel::Stream(stream);
                StepResult::Opened
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", addr, e);
                StepResult::Done(String::from("425 Can't open data connection\r\n"))
            }
        },
        DataChannel::None => {
            StepResult::Done(String::from("426 Connection broken during transfer\r\n"))
        }
        DataChannel::Stream(_) | DataChannel::Control => {
            let mut socket = match data {
                DataChannel::Stream(s) => DataSocket::Stream(s),
                DataChannel::Control => DataSocket::Control(control_wr),
                _ => return StepResult::Continue,
            };

            if matches!(transfer.kind, TransferKind::List { .. }) {
                list::step(transfer, &mut socket).await
            } else if matches!(transfer.kind, TransferKind::Glob { .. }) {
                list::glob_step(transfer, &mut socket).await
            } else if matches!(transfer.kind, TransferKind::Retrieve { .. }) {
                retrieve::step(transfer, &mut socket).await
            } else {
                store::step(transfer, &mut socket).await
            }
        }
    }
}

/// Arm a RETR/STOR/APPE transfer: set up the compressor, resolve and open
/// the target, then hand the session to DATA_CONNECT.
pub async fn xfer_file(session: &mut Session, args: &str, mode: XferFileMode) {
    let deflate_level = session.config.lock().await.deflate_level;

    let zstream = if session.deflate {
        Some(if mode == XferFileMode::Retr {
            ZStream::deflate(deflate_level)
        } else {
            ZStream::inflate()
        })
    } else {
        None
    };

    let path = match session.build_resolved_path(args).await {
        Ok(path) => path,
        Err(e) => {
            session.send_response(&format!("553 {}\r\n", strerror(&e)));
            session.set_state(SessionState::Command, true, true);
            return;
        }
    };

    let mut transfer = if path == DEVZERO_PATH {
        let kind = if mode == XferFileMode::Retr {
            TransferKind::Retrieve { file: None }
        } else {
            TransferKind::Store { file: None }
        };
        Transfer::new(kind, session.deflate, zstream)
    } else if mode == XferFileMode::Retr {
        let real = session.real_path(&path);

        let st = match tokio::fs::metadata(&real).await {
            Ok(st) => st,
            Err(e) => {
                session.send_response(&format!("450 {}\r\n", strerror(&e)));
                return;
            }
        };

        let mut file = match tokio::fs::File::open(&real).await {
            Ok(file) => file,
            Err(e) => {
                session.send_response(&format!("450 {}\r\n", strerror(&e)));
                return;
            }
        };

        if session.restart_position != 0 {
            if let Err(e) = file.seek(SeekFrom::Start(session.restart_position)).await {
                session.send_response(&format!("450 {}\r\n", strerror(&e)));
                return;
            }
        }

        let mut transfer = Transfer::new(
            TransferKind::Retrieve { file: Some(file) },
            session.deflate,
            zstream,
        );
        transfer.file_size = st.len();
        transfer.file_position = session.restart_position;
        transfer
    } else {
        let append = mode == XferFileMode::Appe;
        let real = session.real_path(&path);

        let mut options = tokio::fs::OpenOptions::new();
        if append {
            options.append(true).create(true);
        } else if session.restart_position != 0 {
            // REST without APPE rewrites in place from the offset
            options.write(true);
        } else {
            options.write(true).create(true).truncate(true);
        }

        let mut file = match options.open(&real).await {
            Ok(file) => file,
            Err(e) => {
                session.send_response(&format!("450 {}\r\n", strerror(&e)));
                return;
            }
        };

        session.server.update_free_space();

        if session.restart_position != 0 && !append {
            if let Err(e) = file.seek(SeekFrom::Start(session.restart_position)).await {
                session.send_response(&format!("450 {}\r\n", strerror(&e)));
                return;
            }
        }

        let mut transfer = Transfer::new(
            TransferKind::Store { file: Some(file) },
            session.deflate,
            zstream,
        );
        transfer.file_position = session.restart_position;
        transfer
    };

    if !session.data.is_armed() {
        session.send_response("503 Bad sequence of commands\r\n");
        session.set_state(SessionState::Command, true, true);
        return;
    }

    transfer.work_item = path;

    session.set_state(SessionState::DataConnect, false, true);
    session.transfer = Some(transfer);
}

/// Arm a directory transfer for LIST/NLST/MLSD/MLST/STAT. `workaround`
/// permits retrying a `LIST -a <path>` style argument from clients that
/// expect ls flags to work.
pub async fn xfer_dir(session: &mut Session, args: &str, mode: XferDirMode, workaround: bool) {
    let deflate_level = session.config.lock().await.deflate_level;

    let zstream = if session.deflate {
        Some(ZStream::deflate(deflate_level))
    } else {
        None
    };

    let facts = session.facts;
    let now = Utc::now().timestamp();
    let mut transfer = Transfer::new(
        TransferKind::List {
            dir: None,
            mode,
            lwd: String::new(),
            facts,
            root: session.root.clone(),
        },
        session.deflate,
        zstream,
    );

    let mut args = args;
    let mut workaround = workaround;

    loop {
        if !args.is_empty() {
            // work around broken clients that think LIST -a/-l is valid
            let need_workaround = workaround
                && args.starts_with('-')
                && matches!(args.as_bytes().get(1), Some(b'a') | Some(b'l'))
                && matches!(args.as_bytes().get(2), None | Some(b' '));

            let stripped = if need_workaround {
                let rest = &args[2..];
                rest.strip_prefix(' ').unwrap_or(rest)
            } else {
                ""
            };

            let path = match session.build_resolved_path(args).await {
                Ok(path) => path,
                Err(e) => {
                    if need_workaround {
                        args = stripped;
                        workaround = false;
                        continue;
                    }
                    session.send_response(&format!("550 {}\r\n", strerror(&e)));
                    session.set_state(SessionState::Command, true, true);
                    return;
                }
            };

            let st = match tokio::fs::metadata(session.real_path(&path)).await {
                Ok(st) => st,
                Err(e) => {
                    if need_workaround {
                        args = stripped;
                        workaround = false;
                        continue;
                    }
                    session.send_response(&format!("550 {}\r\n", strerror(&e)));
                    session.set_state(SessionState::Command, true, true);
                    return;
                }
            };

            let info = DirentInfo::from_metadata(&st);

            if mode == XferDirMode::Mlst {
                let display = core_path::encode_path(&path, false);
                if dirent::fill_dirent(
                    transfer.io_buffer(),
                    &info,
                    &display,
                    mode,
                    &facts,
                    None,
                    now,
                )
                .is_none()
                {
                    session.send_response("550 Out of memory\r\n");
                    session.set_state(SessionState::Command, true, true);
                    return;
                }
                transfer.work_item = path;
            } else if st.is_dir() {
                let dir = match tokio::fs::read_dir(session.real_path(&path)).await {
                    Ok(dir) => dir,
                    Err(e) => {
                        session.send_response(&format!("550 {}\r\n", strerror(&e)));
                        session.set_state(SessionState::Command, true, true);
                        return;
                    }
                };

                session.lwd = path.clone();

                if mode == XferDirMode::Mlsd && facts.ty {
                    // the listed directory itself leads as Type=cdir
                    let display = core_path::encode_path(&path, false);
                    if dirent::fill_dirent(
                        transfer.io_buffer(),
                        &info,
                        &display,
                        mode,
                        &facts,
                        Some("cdir"),
                        now,
                    )
                    .is_none()
                    {
                        session.send_response("550 Out of memory\r\n");
                        session.set_state(SessionState::Command, true, true);
                        return;
                    }
                }

                if let TransferKind::List { dir: slot, lwd, .. } = &mut transfer.kind {
                    *slot = Some(dir);
                    *lwd = path.clone();
                }
                transfer.work_item = path;
            } else if mode == XferDirMode::Mlsd {
                // MLSD requires a directory argument
                session.send_response("501 Not a directory\r\n");
                session.set_state(SessionState::Command, true, true);
                return;
            } else {
                let display = if mode == XferDirMode::Nlst {
                    core_path::encode_path(&path, false)
                } else {
                    let name = path.rsplit('/').next().unwrap_or(&path);
                    core_path::encode_path(name, false)
                };

                if dirent::fill_dirent(
                    transfer.io_buffer(),
                    &info,
                    &display,
                    mode,
                    &facts,
                    None,
                    now,
                )
                .is_none()
                {
                    session.send_response("550 Out of memory\r\n");
                    session.set_state(SessionState::Command, true, true);
                    return;
                }
                transfer.work_item = path;
            }
        } else if mode == XferDirMode::Mlst {
            let st = match tokio::fs::metadata(session.real_path(&session.cwd)).await {
                Ok(st) => st,
                Err(e) => {
                    session.send_response(&format!("550 {}\r\n", strerror(&e)));
                    session.set_state(SessionState::Command, true, true);
                    return;
                }
            };

            let info = DirentInfo::from_metadata(&st);
            let display = core_path::encode_path(&session.cwd, false);
            if dirent::fill_dirent(transfer.io_buffer(), &info, &display, mode, &facts, None, now)
                .is_none()
            {
                session.send_response("550 Out of memory\r\n");
                session.set_state(SessionState::Command, true, true);
                return;
            }
            transfer.work_item = session.cwd.clone();
        } else {
            let real = session.real_path(&session.cwd);
            let dir = match tokio::fs::read_dir(&real).await {
                Ok(dir) => dir,
                Err(e) => {
                    session.send_response(&format!("550 {}\r\n", strerror(&e)));
                    session.set_state(SessionState::Command, true, true);
                    return;
                }
            };

            session.lwd = session.cwd.clone();

            if mode == XferDirMode::Mlsd && facts.ty {
                match tokio::fs::metadata(&real).await {
                    Ok(st) => {
                        let info = DirentInfo::from_metadata(&st);
                        let display = core_path::encode_path(&session.lwd, false);
                        if dirent::fill_dirent(
                            transfer.io_buffer(),
                            &info,
                            &display,
                            mode,
                            &facts,
                            Some("cdir"),
                            now,
                        )
                        .is_none()
                        {
                            session.send_response("550 Out of memory\r\n");
                            session.set_state(SessionState::Command, true, true);
                            return;
                        }
                    }
                    Err(e) => {
                        session.send_response(&format!("550 {}\r\n", strerror(&e)));
                        session.set_state(SessionState::Command, true, true);
                        return;
                    }
                }
            }

            if let TransferKind::List { dir: slot, lwd, .. } = &mut transfer.kind {
                *slot = Some(dir);
                *lwd = session.lwd.clone();
            }
            transfer.work_item = session.lwd.clone();
        }

        break;
    }

    if mode == XferDirMode::Mlst || mode == XferDirMode::Stat {
        // these ride the command channel inside a 250- reply
        session.send_response("250-Status\r\n");
        session.set_state(SessionState::DataTransfer, true, true);
        session.data = DataChannel::Control;
        session.transfer = Some(transfer);
        return;
    }

    if !session.data.is_armed() {
        session.send_response("503 Bad sequence of commands\r\n");
        session.set_state(SessionState::Command, true, true);
        return;
    }

    session.set_state(SessionState::DataConnect, false, true);
    session.transfer = Some(transfer);
}

/// Arm a wildcard NLST. The pattern is globbed under the real root and each
/// match is reported with its virtual full path.
pub fn xfer_glob(session: &mut Session, args: &str) {
    let pattern_path = session.real_path(&core_path::build_path(&session.cwd, args));
    let pattern = pattern_path.to_string_lossy().into_owned();

    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            session.send_response(&format!("501 {}\r\n", e.msg));
            session.set_state(SessionState::Command, false, false);
            return;
        }
    };

    if !session.data.is_armed() {
        session.send_response("503 Bad sequence of commands\r\n");
        session.set_state(SessionState::Command, true, true);
        return;
    }

    let mut transfer = Transfer::new(
        TransferKind::Glob {
            paths,
            root: session.root.clone(),
        },
        false,
        None,
    );
    transfer.work_item = String::from(args);

    session.set_state(SessionState::DataConnect, false, true);
    session.transfer = Some(transfer);
}
