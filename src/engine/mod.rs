pub mod payload;
pub mod state_machine;

pub use payload::Payload;
pub use state_machine::Engine;
