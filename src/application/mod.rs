pub mod export;
pub mod gate;
pub mod history;
pub mod plan_resolver;
pub mod prompt;
pub mod quota_manager;
pub mod session;
pub mod text_service;

pub use export::*;
pub use gate::*;
pub use history::*;
pub use plan_resolver::*;
pub use prompt::*;
pub use quota_manager::*;
pub use session::*;
pub use text_service::*;
