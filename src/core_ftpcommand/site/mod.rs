mod handler;

pub use handler::handle_site_command;
