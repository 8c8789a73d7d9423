pub mod block;
pub mod channel;
pub mod command;
pub mod variant;

pub use channel::CommandChannel;
pub use command::Command;
pub use variant::ProtocolVariant;
