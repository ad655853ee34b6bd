pub mod assist;
pub mod chat_history;
pub mod diagnostics;
pub mod health;
pub mod presence;
pub mod project_files;
pub mod projects;

pub use assist::*;
pub use chat_history::*;
pub use diagnostics::*;
pub use health::*;
pub use presence::*;
pub use project_files::*;
pub use projects::*;
