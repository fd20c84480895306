pub mod memory;
pub mod pinecone;
pub mod pinecone_admin;

pub use memory::MemoryIndex;
pub use pinecone::{IndexStats, PineconeIndex};
pub use pinecone_admin::{IndexDescription, IndexSetup, IndexSpec, PineconeAdmin};
