//! Shared helpers for collection tests

#![allow(dead_code)]

use std::sync::{Arc, Once};

use atlas_collections::{Engine, Store};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route library logs to the test harness (`RUST_LOG=debug cargo test`)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fresh in-memory engine behind the `Store` trait
pub fn memory_store() -> Arc<dyn Store> {
    init_tracing();
    Arc::new(Engine::in_memory())
}

/// Number of keys currently held by the default column family
pub fn key_count(engine: &Engine) -> usize {
    engine.entry_count("default").unwrap()
}
