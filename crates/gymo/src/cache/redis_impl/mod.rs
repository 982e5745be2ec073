//! Redis cache backend implementation.
//!
//! Provides a shared cache for multi-instance deployments, with connection
//! pooling, TTL and scope deletion.

mod cache;
mod error;

pub use cache::RedisCache;
