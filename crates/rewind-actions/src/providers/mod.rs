mod json_file;
mod memory;

pub use json_file::JsonFileActionStore;
pub use memory::MemoryActionStore;
pub use rewind_log::{JsonFileCompensationStore, MemoryCompensationStore};
