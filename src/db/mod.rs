//! Vector index clients.
//!
//! - `pinecone` - Managed cloud index over REST (default)
//! - `InMemoryVectorIndex` - Process-local cosine index for local runs and tests
//!
//! Enable providers via Cargo features:
//! ```toml
//! relay-server = { version = "*", default-features = false, features = ["pinecone"] }
//! ```


// Vector index abstraction layer
pub mod vectorstore;

// Provider implementations
#[cfg(feature = "pinecone")]
pub mod pinecone;

// Re-exports
pub use vectorstore::{InMemoryVectorIndex, VectorIndex, VectorIndexProvider};

#[cfg(feature = "pinecone")]
pub use pinecone::PineconeIndex;
