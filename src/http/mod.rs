pub mod health;
pub mod process;
pub mod reload;
pub mod root;
pub mod server;

pub use server::{HostServer, ServerState};
