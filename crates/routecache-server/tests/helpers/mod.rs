//! Test helpers para routecache-server.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod stores;

pub use client::{TestClient, TestResponse, client, test_cache, test_state};
pub use stores::FailingStore;
