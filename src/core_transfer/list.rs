//! Pumps for directory listings and wildcard NLST.

use chrono::Utc;
use log::warn;

use super::{dirent, drain, DataSocket, DirentInfo, StepResult, Transfer, TransferKind, XferDirMode};
use crate::core_path;

/// One step of LIST/NLST/MLSD/MLST/STAT: produce the next entry when the
/// wire buffer has drained, then push pending bytes at the socket.
pub async fn step(transfer: &mut Transfer, socket: &mut DataSocket<'_>) -> StepResult {
    let mode = match &transfer.kind {
        TransferKind::List { mode, .. } => *mode,
        _ => return StepResult::Done(String::from("426 Connection broken during transfer\r\n")),
    };
    let final_code = match mode {
        XferDirMode::Mlst | XferDirMode::Stat => 250,
        _ => 226,
    };

    while transfer.xfer_buffer.is_empty() {
        transfer.xfer_buffer.clear();

        if transfer.deflate {
            if !transfer.zstream_buffer.is_empty() {
                if let Err(reply) = transfer.deflate_step(false) {
                    return StepResult::Done(reply);
                }
                continue;
            }
            if !transfer.z_flushed && transfer.eof {
                if let Err(reply) = transfer.deflate_step(true) {
                    return StepResult::Done(reply);
                }
                continue;
            }
        }
        transfer.zstream_buffer.clear();

        if transfer.eof && (transfer.deflate == transfer.z_flushed) {
            return StepResult::Done(format!("{} OK\r\n", final_code));
        }

        // pull the next directory entry; a pre-filled single entry
        // (file argument or MLST) has no open directory behind it
        let entry = {
            let TransferKind::List { dir, .. } = &mut transfer.kind else {
                unreachable!();
            };
            match dir {
                None => None,
                Some(rd) => match rd.next_entry().await {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Directory read failed: {}", e);
                        None
                    }
                },
            }
        };

        let Some(entry) = entry else {
            transfer.eof = true;
            continue;
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "." || name == ".." {
            continue;
        }

        let TransferKind::List {
            lwd, facts, root, ..
        } = &transfer.kind
        else {
            unreachable!();
        };

        let io_buffer = if transfer.deflate {
            &mut transfer.zstream_buffer
        } else {
            &mut transfer.xfer_buffer
        };

        if mode == XferDirMode::Nlst {
            // NLST reports the whole path name
            let full = core_path::build_path(lwd, &name);
            let line = format!("{}\r\n", core_path::encode_path(&full, false));
            if !io_buffer.push(line.as_bytes()) {
                return StepResult::Done(String::from("501 Out of memory\r\n"));
            }
            transfer.file_position += line.len() as u64;
        } else {
            let full = core_path::build_path(lwd, &name);
            let real = core_path::real_path(root, &full);
            let st = match tokio::fs::symlink_metadata(&real).await {
                Ok(st) => st,
                Err(e) => {
                    warn!("Skipping {}: {}", full, e);
                    continue;
                }
            };

            let info = DirentInfo::from_metadata(&st);
            let display = core_path::encode_path(&name, false);
            let now = Utc::now().timestamp();
            match dirent::fill_dirent(io_buffer, &info, &display, mode, facts, None, now) {
                Some(n) => transfer.file_position += n as u64,
                None => return StepResult::Done(String::from("425 Out of memory\r\n")),
            }
        }

        if transfer.deflate {
            continue;
        }
    }

    drain(transfer, socket).await
}

/// One step of a wildcard NLST: emit the next glob match as a full virtual
/// path, then drain.
pub async fn glob_step(transfer: &mut Transfer, socket: &mut DataSocket<'_>) -> StepResult {
    if transfer.xfer_buffer.is_empty() {
        transfer.xfer_buffer.clear();

        let line = {
            let TransferKind::Glob { paths, root } = &mut transfer.kind else {
                unreachable!();
            };

            loop {
                match paths.next() {
                    None => break None,
                    Some(Err(e)) => {
                        warn!("Skipping glob entry: {}", e);
                        continue;
                    }
                    Some(Ok(path)) => {
                        let virtual_path = match path.strip_prefix(root) {
                            Ok(rest) => format!("/{}", rest.display()),
                            Err(_) => path.display().to_string(),
                        };
                        break Some(format!(
                            "{}\r\n",
                            core_path::encode_path(&virtual_path, false)
                        ));
                    }
                }
            }
        };

        let Some(line) = line else {
            return StepResult::Done(String::from("226 OK\r\n"));
        };

        if !transfer.xfer_buffer.push(line.as_bytes()) {
            return StepResult::Done(String::from("501 Out of memory\r\n"));
        }
        transfer.file_position += line.len() as u64;
    }

    drain(transfer, socket).await
}
