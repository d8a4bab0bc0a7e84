//! nowplaying library
//!
//! A caching proxy for the Last.fm recent tracks API. Exposes the cache gate,
//! stores, upstream client and HTTP router for the binary and for integration tests.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod server;
pub mod upstream;
