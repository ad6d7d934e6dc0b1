pub mod analysis;
pub mod history;
pub mod plan;
pub mod quota;
pub mod request;
pub mod style;

pub use analysis::*;
pub use history::*;
pub use plan::*;
pub use quota::*;
pub use request::*;
pub use style::*;
