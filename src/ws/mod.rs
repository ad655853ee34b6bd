pub mod gatekeeper;
pub mod hub;
pub mod presence;
pub mod rooms;
pub mod session;

pub use hub::CollabHub;
pub use session::Session;
