mod init;
mod spans;
mod tick_id;

pub use init::init_logger;
pub use spans::tick_span;
pub use tick_id::TickId;
