//! Persistent store for project records

mod file;
mod memory;

pub use file::FileProjectStore;
pub use memory::MemoryProjectStore;
