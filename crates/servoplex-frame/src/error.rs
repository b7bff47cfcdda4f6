/// Errors that can occur while receiving frames or writing display commands.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The ring buffer is full; the incoming byte was dropped.
    #[error("ring buffer full ({capacity} bytes), byte dropped")]
    BufferFull { capacity: usize },

    /// The frame carried a command type outside the known set.
    #[error("unknown command type 0x{0:02X}")]
    UnknownCommand(u8),

    /// A display widget name or text cannot be encoded as a panel command.
    #[error("invalid display command: {0}")]
    InvalidWidget(String),

    /// An I/O error occurred while reading or writing the serial stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial stream reached EOF.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
