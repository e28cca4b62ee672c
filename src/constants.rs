// src/constants.rs

/// Default configuration file, rewritten by SITE SAVE.
pub const FTPDCONFIG: &str = "/etc/pocketftpd.conf";

/// Inbound command bytes staged between reads.
pub const COMMAND_BUFFERSIZE: usize = 4096;

/// Outbound reply text staged between writes.
pub const RESPONSE_BUFFERSIZE: usize = 4096;

/// Data-channel staging, both the raw and the compressed side.
pub const XFER_BUFFERSIZE: usize = 64 * 1024;

/// Seconds without progress before a session is swept.
pub const IDLE_TIMEOUT: u64 = 60;

/// Telnet Data Mark; delimits urgent data on the command channel.
pub const TELNET_DM: u8 = 0xF2;

/// Telnet Interrupt Process.
pub const TELNET_IP: u8 = 0xF4;

/// Telnet Interpret As Command prefix.
pub const TELNET_IAC: u8 = 0xFF;

/// Diagnostic sink: RETR produces endless zeros, STOR discards.
/// Reserved for transfer-rate testing; never listed.
pub const DEVZERO_PATH: &str = "/devZero";
