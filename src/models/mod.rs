pub mod assist;
pub mod chat;
pub mod diagnostics;
pub mod error;
pub mod files;
pub mod health;
pub mod language;
pub mod messages;
pub mod presence;
pub mod project;
pub mod project_requests;

pub use assist::*;
pub use chat::*;
pub use diagnostics::*;
pub use error::*;
pub use files::*;
pub use health::*;
pub use messages::*;
pub use presence::*;
pub use project::*;
pub use project_requests::*;
