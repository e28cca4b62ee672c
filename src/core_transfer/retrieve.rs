//! Pump for RETR: file (or zero sink) to data socket, optionally deflated.

use tokio::io::AsyncReadExt;

use super::{drain, DataSocket, StepResult, Transfer, TransferKind};
use crate::helpers::strerror;

pub async fn step(transfer: &mut Transfer, socket: &mut DataSocket<'_>) -> StepResult {
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
            return StepResult::Done(String::from("226 OK\r\n"));
        }

        let io_buffer = if transfer.deflate {
            &mut transfer.zstream_buffer
        } else {
            &mut transfer.xfer_buffer
        };

        match &mut transfer.kind {
            TransferKind::Retrieve { file: Some(file) } => {
                match file.read(io_buffer.free_area_mut()).await {
                    Err(e) => return StepResult::Done(format!("451 {}\r\n", strerror(&e))),
                    Ok(0) => {
                        transfer.eof = true;
                        continue;
                    }
                    Ok(n) => {
                        io_buffer.mark_used(n);
                        transfer.file_position += n as u64;
                    }
                }
            }
            TransferKind::Retrieve { file: None } => {
                // the zero sink never runs dry
                let size = io_buffer.free_size();
                io_buffer.free_area_mut().fill(0);
                io_buffer.mark_used(size);
                transfer.file_position += size as u64;
            }
            _ => return StepResult::Done(String::from("426 Connection broken during transfer\r\n")),
        }

        if transfer.deflate {
            continue;
        }
    }

    drain(transfer, socket).await
}
