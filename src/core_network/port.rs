use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::session::{DataChannel, Session, SessionState};

/// Parse the PORT argument `h1,h2,h3,h4,p1,p2`. Exactly six fields, each
/// 0-255.
pub fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let fields: Vec<&str> = arg.trim().split(',').collect();
    if fields.len() != 6 {
        return None;
    }

    let mut values = [0u8; 6];
    for (slot, field) in values.iter_mut().zip(&fields) {
        *slot = field.parse::<u8>().ok()?;
    }

    let ip = Ipv4Addr::new(values[0], values[1], values[2], values[3]);
    let port = u16::from(values[4]) << 8 | u16::from(values[5]);
    Some(SocketAddr::new(IpAddr::V4(ip), port))
}

/// Handles the PORT FTP command.
///
/// Stores the peer address; the actual connect happens when a transfer is
/// armed.
pub async fn handle_port_command(session: &mut Session, arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    // a new PORT throws away any previous arming
    session.set_state(SessionState::Command, true, true);

    let Some(addr) = parse_port_argument(arg) else {
        session.send_response("501 Invalid argument\r\n");
        return Ok(());
    };

    session.data = DataChannel::PortAddr(addr);
    session.send_response("200 OK\r\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_argument() {
        let addr = parse_port_argument("127,0,0,1,4,1").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:1025");
    }

    #[test]
    fn test_parse_port_argument_rejects_bad_input() {
        assert!(parse_port_argument("127,0,0,1,4").is_none());
        assert!(parse_port_argument("127,0,0,1,4,1,9").is_none());
        assert!(parse_port_argument("256,0,0,1,4,1").is_none());
        assert!(parse_port_argument("a,b,c,d,e,f").is_none());
        assert!(parse_port_argument("").is_none());
    }
}
