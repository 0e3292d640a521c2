pub mod job;
pub mod record;
pub mod requests;

pub use job::*;
pub use record::*;
pub use requests::*;
