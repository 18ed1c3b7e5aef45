pub mod common;
pub mod folders;
pub mod notes;
pub mod sync;
