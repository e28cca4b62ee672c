//! Extraction of command lines from the inbound byte stream.
//!
//! One command per CRLF (or bare LF). Before a line is cut, any Telnet
//! urgent prelude is discarded: an aborting client sends Interrupt-Process
//! and a Data Mark ahead of ABOR, and everything up to and including the
//! mark must be dropped so the ABOR is seen promptly even when transfer
//! bytes are still queued.

use crate::constants::{TELNET_DM, TELNET_IAC, TELNET_IP};
use crate::core_buffer::RingBuffer;
use crate::core_path;

/// Drop buffered bytes up to and including the last Telnet Data Mark. When
/// only the prelude has arrived so far, discard that instead of letting it
/// be parsed as a command.
pub fn strip_urgent(buffer: &mut RingBuffer) -> bool {
    let used = buffer.used_area();
    let mark = used.iter().rposition(|&b| b == TELNET_DM);

    match mark {
        Some(pos) => {
            buffer.mark_free(pos + 1);
            buffer.coalesce();
            true
        }
        None => {
            while matches!(
                buffer.used_area().first(),
                Some(&TELNET_IAC) | Some(&TELNET_IP)
            ) {
                buffer.mark_free(1);
            }
            buffer.coalesce();
            false
        }
    }
}

/// Cut the next complete command line out of the buffer, decoding the NUL
/// sentinel back into LF. Returns None until a full line has arrived.
pub fn next_command(buffer: &mut RingBuffer) -> Option<String> {
    let used = buffer.used_area();
    let newline = used.iter().position(|&b| b == b'\n')?;

    let mut end = newline;
    if end > 0 && used[end - 1] == b'\r' {
        end -= 1;
    }

    let mut line = used[..end].to_vec();
    buffer.mark_free(newline + 1);
    buffer.coalesce();

    core_path::decode_path(&mut line);
    Some(String::from_utf8_lossy(&line).into_owned())
}

/// Split a command line into its verb and argument at the first whitespace.
/// The argument keeps any further spaces; paths may contain them.
pub fn split_verb(line: &str) -> (&str, &str) {
    match line.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&line[..pos], line[pos + 1..].trim_start_matches(' ')),
        None => (line, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(bytes: &[u8]) -> RingBuffer {
        let mut buffer = RingBuffer::new(256);
        assert!(buffer.push(bytes));
        buffer
    }

    #[test]
    fn test_next_command_needs_full_line() {
        let mut buffer = buffer_with(b"NOOP");
        assert_eq!(next_command(&mut buffer), None);

        buffer.push(b"\r\n");
        assert_eq!(next_command(&mut buffer).as_deref(), Some("NOOP"));
        assert_eq!(next_command(&mut buffer), None);
    }

    #[test]
    fn test_next_command_accepts_bare_lf() {
        let mut buffer = buffer_with(b"PWD\nSYST\r\n");
        assert_eq!(next_command(&mut buffer).as_deref(), Some("PWD"));
        assert_eq!(next_command(&mut buffer).as_deref(), Some("SYST"));
    }

    #[test]
    fn test_next_command_decodes_nul_as_lf() {
        let mut buffer = buffer_with(b"DELE a\0b\r\n");
        assert_eq!(next_command(&mut buffer).as_deref(), Some("DELE a\nb"));
    }

    #[test]
    fn test_strip_urgent_discards_through_data_mark() {
        let mut buffer = buffer_with(&[TELNET_IAC, TELNET_IP, TELNET_IAC, TELNET_DM]);
        buffer.push(b"ABOR\r\n");

        assert!(strip_urgent(&mut buffer));
        assert_eq!(next_command(&mut buffer).as_deref(), Some("ABOR"));
    }

    #[test]
    fn test_strip_urgent_without_mark() {
        let mut buffer = buffer_with(b"NOOP\r\n");
        assert!(!strip_urgent(&mut buffer));
        assert_eq!(next_command(&mut buffer).as_deref(), Some("NOOP"));
    }

    #[test]
    fn test_strip_urgent_prelude_only() {
        let mut buffer = buffer_with(&[TELNET_IAC, TELNET_IP]);
        assert!(!strip_urgent(&mut buffer));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_split_verb() {
        assert_eq!(split_verb("RETR some file.bin"), ("RETR", "some file.bin"));
        assert_eq!(split_verb("NOOP"), ("NOOP", ""));
        assert_eq!(split_verb("CWD  spaced"), ("CWD", "spaced"));
    }
}
