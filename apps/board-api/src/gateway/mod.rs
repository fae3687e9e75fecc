pub mod events;
pub mod presence;
pub mod registry;
pub mod server;
pub mod session;
