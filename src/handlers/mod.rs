pub mod health;
pub mod summary;
pub mod task_sync;

pub use health::*;
pub use summary::*;
pub use task_sync::*;
