//! Storage adapters for the kernel's store traits.

mod in_memory;

pub use in_memory::InMemoryStore;
