//! In-memory storage backend.
//!
//! Every table lives in one `Arc<RwLock<_>>`, so each operation (including
//! cascade detach) happens under a single write guard. Useful for development
//! and for tests where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use gymo::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! ```

mod repository;

pub use repository::InMemoryRepository;
