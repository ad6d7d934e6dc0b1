pub mod clock;
pub mod config;
pub mod llm;
pub mod repository;
pub mod store;

pub use clock::*;
pub use config::*;
pub use llm::*;
pub use repository::*;
pub use store::*;
