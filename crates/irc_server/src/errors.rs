use thiserror::Error;

/// Raised by the line framer on non-UTF-8 input (spec §4.A, §7.2).
#[derive(Error, Debug)]
pub enum FramerError {
    #[error("invalid UTF-8 in inbound stream: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Fatal, startup-only errors (spec §7.5): logged once and the process
/// exits non-zero. Never raised once the event loop is running.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to load configuration: {0}")]
    Config(String),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
