//! Settings store implementations

mod in_memory;
mod json_file;

pub use in_memory::InMemorySettingsStore;
pub use json_file::JsonFileSettingsStore;
