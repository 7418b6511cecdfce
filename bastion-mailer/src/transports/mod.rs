mod file;
mod smtp;

pub use file::FileTransport;
pub use smtp::{SmtpSecurity, SmtpTransport};
