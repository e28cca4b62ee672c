//! Streaming MODE Z compression with partial-input/partial-output semantics.
//!
//! Both directions run off the two staging buffers: the raw side lives in
//! `zstream_buffer` and the wire side in `xfer_buffer` for downloads, with
//! the roles reversed for uploads. Each call consumes and produces whatever
//! fits; the caller retries once the buffers have drained.

use crate::core_buffer::RingBuffer;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZStreamError {
    #[error("{0}")]
    Deflate(#[from] flate2::CompressError),
    #[error("{0}")]
    Inflate(#[from] flate2::DecompressError),
    #[error("incomplete deflate stream")]
    Truncated,
}

pub enum ZStream {
    Deflate(Compress),
    Inflate(Decompress),
}

impl ZStream {
    /// Compressor for RETR and directory listings under MODE Z; emits a
    /// zlib-wrapped stream.
    pub fn deflate(level: u32) -> Self {
        ZStream::Deflate(Compress::new(Compression::new(level), true))
    }

    /// Decompressor for STOR/APPE under MODE Z.
    pub fn inflate() -> Self {
        ZStream::Inflate(Decompress::new(true))
    }

    /// Feed raw bytes from `input` into the compressor, writing output into
    /// `output`. With `finish` the stream is terminated; returns true once
    /// the trailer has been emitted.
    pub fn deflate_buffer(
        &mut self,
        input: &mut RingBuffer,
        output: &mut RingBuffer,
        finish: bool,
    ) -> Result<bool, ZStreamError> {
        let z = match self {
            ZStream::Deflate(z) => z,
            ZStream::Inflate(_) => unreachable!("deflate on an inflate stream"),
        };

        let before_in = z.total_in();
        let before_out = z.total_out();
        let flush = if finish {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };

        let status = z.compress(input.used_area(), output.free_area_mut(), flush)?;

        input.mark_free((z.total_in() - before_in) as usize);
        output.mark_used((z.total_out() - before_out) as usize);

        Ok(status == Status::StreamEnd)
    }

    /// Feed wire bytes from `input` through the decompressor. Returns true
    /// once the end of the deflate stream was reached; a stall with no
    /// input left means the peer truncated the stream.
    pub fn inflate_buffer(
        &mut self,
        input: &mut RingBuffer,
        output: &mut RingBuffer,
    ) -> Result<bool, ZStreamError> {
        let z = match self {
            ZStream::Inflate(z) => z,
            ZStream::Deflate(_) => unreachable!("inflate on a deflate stream"),
        };

        let before_in = z.total_in();
        let before_out = z.total_out();

        let status = z.decompress(input.used_area(), output.free_area_mut(), FlushDecompress::None)?;

        input.mark_free((z.total_in() - before_in) as usize);
        output.mark_used((z.total_out() - before_out) as usize);

        match status {
            Status::StreamEnd => Ok(true),
            Status::Ok => Ok(false),
            Status::BufError => Err(ZStreamError::Truncated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::XFER_BUFFERSIZE;

    fn pump_deflate(z: &mut ZStream, payload: &[u8]) -> Vec<u8> {
        let mut input = RingBuffer::new(XFER_BUFFERSIZE);
        let mut output = RingBuffer::new(XFER_BUFFERSIZE);
        assert!(input.push(payload));

        let mut wire = Vec::new();
        while !z.deflate_buffer(&mut input, &mut output, true).unwrap() {
            wire.extend_from_slice(output.used_area());
            output.clear();
        }
        wire.extend_from_slice(output.used_area());
        wire
    }

    #[test]
    fn test_roundtrip_through_ring_buffers() {
        let payload = b"hello world hello world hello world";

        let mut deflater = ZStream::deflate(6);
        let wire = pump_deflate(&mut deflater, payload);
        assert!(!wire.is_empty());

        let mut inflater = ZStream::inflate();
        let mut input = RingBuffer::new(XFER_BUFFERSIZE);
        let mut output = RingBuffer::new(XFER_BUFFERSIZE);
        assert!(input.push(&wire));

        let mut plain = Vec::new();
        loop {
            let done = inflater.inflate_buffer(&mut input, &mut output).unwrap();
            plain.extend_from_slice(output.used_area());
            output.clear();
            if done {
                break;
            }
        }

        assert_eq!(plain, payload);
    }

    #[test]
    fn test_inflate_partial_input_makes_progress() {
        let payload = vec![7u8; 4096];
        let mut deflater = ZStream::deflate(9);
        let wire = pump_deflate(&mut deflater, &payload);

        let mut inflater = ZStream::inflate();
        let mut input = RingBuffer::new(XFER_BUFFERSIZE);
        let mut output = RingBuffer::new(XFER_BUFFERSIZE);

        let mut plain = Vec::new();
        let mut done = false;
        for chunk in wire.chunks(16) {
            assert!(input.push(chunk));
            done = inflater.inflate_buffer(&mut input, &mut output).unwrap();
            plain.extend_from_slice(output.used_area());
            output.clear();
        }

        assert!(done);
        assert_eq!(plain, payload);
    }

    #[test]
    fn test_inflate_truncated_stream_errors() {
        let mut deflater = ZStream::deflate(6);
        let wire = pump_deflate(&mut deflater, b"some payload that will be cut short");

        let mut inflater = ZStream::inflate();
        let mut input = RingBuffer::new(XFER_BUFFERSIZE);
        let mut output = RingBuffer::new(XFER_BUFFERSIZE);
        assert!(input.push(&wire[..wire.len() / 2]));

        // Half the stream inflates fine
        assert!(!inflater.inflate_buffer(&mut input, &mut output).unwrap());
        output.clear();

        // With the input exhausted and no trailer, the stream has stalled
        assert!(matches!(
            inflater.inflate_buffer(&mut input, &mut output),
            Err(ZStreamError::Truncated)
        ));
    }
}
