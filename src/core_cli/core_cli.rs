use clap::Parser;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "pocketftpd", about = "A small FTP server written in Rust.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Override the listen port from the configuration
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the directory the FTP namespace is rooted at
    #[arg(short, long)]
    pub root: Option<String>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}
