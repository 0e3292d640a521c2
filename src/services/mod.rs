pub mod anycross;
pub mod jobs;
pub mod task_sync;

pub use anycross::*;
pub use jobs::*;
pub use task_sync::*;
