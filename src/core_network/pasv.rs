use log::info;
use std::net::IpAddr;
use tokio::net::TcpListener;

use crate::session::{DataChannel, Session, SessionState};

/// Handles the PASV FTP command.
///
/// Binds a one-shot listener next to the control socket's local address and
/// tells the client where to connect. The listener is consumed by the first
/// transfer that gets armed.
pub async fn handle_pasv_command(session: &mut Session, _arg: &str) -> Result<(), std::io::Error> {
    if !session.authorized() {
        session.set_state(SessionState::Command, false, false);
        session.send_response("530 Not logged in\r\n");
        return Ok(());
    }

    // a new PASV throws away any previous arming
    session.set_state(SessionState::Command, true, true);

    let local_ip = session.local_addr.ip();
    let listener = match TcpListener::bind((local_ip, 0)).await {
        Ok(listener) => listener,
        Err(_) => {
            session.send_response("451 Failed to create listening socket\r\n");
            return Ok(());
        }
    };

    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(_) => {
            session.send_response("451 Failed to bind address\r\n");
            return Ok(());
        }
    };

    let IpAddr::V4(ip) = addr.ip() else {
        // data connections are IPv4 only
        session.send_response("451 Failed to bind address\r\n");
        return Ok(());
    };

    info!("Listening on [{}]:{}", ip, addr.port());

    let octets = ip.octets();
    session.data = DataChannel::PasvListener(listener);
    session.send_response(&format!(
        "227 Entering Passive Mode ({},{},{},{},{},{}).\r\n",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        addr.port() >> 8,
        addr.port() & 0xFF
    ));

    Ok(())
}
