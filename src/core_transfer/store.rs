//! Pump for STOR/APPE: data socket to file (or the discard sink), with
//! inline inflation under MODE Z.

use tokio::io::AsyncWriteExt;

use super::{DataSocket, StepResult, Transfer, TransferKind};
use crate::helpers::strerror;

pub async fn step(transfer: &mut Transfer, socket: &mut DataSocket<'_>) -> StepResult {
    while transfer.xfer_buffer.is_empty() {
        transfer.xfer_buffer.clear();

        if transfer.deflate && !transfer.zstream_buffer.is_empty() {
            if let Err(reply) = transfer.inflate_step() {
                return StepResult::Done(reply);
            }
            continue;
        }

        if transfer.deflate && !transfer.z_flushed && transfer.eof {
            // the peer closed before the deflate trailer; let the
            // decompressor report the truncation
            if let Err(reply) = transfer.inflate_step() {
                return StepResult::Done(reply);
            }
            continue;
        }

        if transfer.eof && (transfer.deflate == transfer.z_flushed) {
            // settle any write still in flight before confirming
            if let TransferKind::Store { file: Some(file) } = &mut transfer.kind {
                if let Err(e) = file.flush().await {
                    return StepResult::Done(format!("451 {}\r\n", strerror(&e)));
                }
            }
            return StepResult::Done(String::from("226 OK\r\n"));
        }

        let io_buffer = if transfer.deflate {
            &mut transfer.zstream_buffer
        } else {
            &mut transfer.xfer_buffer
        };

        match socket.read(io_buffer.free_area_mut()).await {
            Err(e) => return StepResult::Done(format!("451 {}\r\n", strerror(&e))),
            Ok(0) => {
                transfer.eof = true;
                continue;
            }
            Ok(n) => io_buffer.mark_used(n),
        }

        if transfer.deflate {
            continue;
        }
    }

    let pending = transfer.xfer_buffer.used_size();
    match &mut transfer.kind {
        TransferKind::Store { file: Some(file) } => {
            match file.write(transfer.xfer_buffer.used_area()).await {
                Ok(0) => return StepResult::Done(String::from("426 Failed to write data\r\n")),
                Ok(n) => {
                    transfer.xfer_buffer.mark_free(n);
                    transfer.xfer_buffer.coalesce();
                    transfer.file_position += n as u64;
                }
                Err(e) => return StepResult::Done(format!("426 {}\r\n", strerror(&e))),
            }
        }
        TransferKind::Store { file: None } => {
            transfer.file_position += pending as u64;
            transfer.xfer_buffer.clear();
        }
        _ => return StepResult::Done(String::from("426 Connection broken during transfer\r\n")),
    }

    StepResult::Continue
}
