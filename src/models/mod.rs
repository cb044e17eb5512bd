pub mod content;
pub mod notification;
pub mod report;
pub mod user;
pub mod vote;

pub use content::*;
pub use notification::*;
pub use report::*;
pub use user::*;
pub use vote::*;
