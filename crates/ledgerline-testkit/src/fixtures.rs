//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use ledgerline::{Engine, EngineConfig};
use ledgerline_core::CollectionName;
use ledgerline_store::MemoryKv;
use ledgerline_sync::{ConnectivitySignal, Identity, MemoryRemote, SessionIdentity};

/// User the fixtures sign in as.
pub const TEST_USER: &str = "user-1";

/// An in-memory world an engine runs against.
///
/// Storage outlives engines: building a second engine from the same fixture
/// simulates an app restart (fresh in-memory state, same persisted data).
pub struct TestFixture {
    pub kv: Arc<MemoryKv>,
    pub remote: Arc<MemoryRemote>,
    pub session: Arc<SessionIdentity>,
    pub network: Arc<ConnectivitySignal>,
    pub config: EngineConfig,
}

impl TestFixture {
    /// Signed in, online, default triggers.
    pub fn new() -> Self {
        Self {
            kv: Arc::new(MemoryKv::new()),
            remote: MemoryRemote::new(),
            session: SessionIdentity::signed_in(Identity::new(TEST_USER)),
            network: ConnectivitySignal::new(true),
            config: EngineConfig::default(),
        }
    }

    /// Like [`new`](Self::new) with every automatic trigger off, so tests
    /// drive pull and flush explicitly.
    pub fn manual() -> Self {
        let mut fixture = Self::new();
        fixture.config.sync.sync_on_open = false;
        fixture.config.sync.flush_on_mutation = false;
        fixture.config.sync.sync_on_reconnect = false;
        fixture
    }

    /// Signed in but offline.
    pub fn offline() -> Self {
        let fixture = Self::new();
        fixture.network.set_online(false);
        fixture
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// A new engine over this fixture's storage and collaborators.
    pub fn engine(&self) -> Engine {
        Engine::new(
            self.kv.clone(),
            self.remote.clone(),
            self.session.clone(),
            self.network.clone(),
            self.config.clone(),
        )
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Collection name from a literal known to be valid.
pub fn collection_name(name: &str) -> CollectionName {
    CollectionName::new(name).unwrap_or_else(|e| panic!("bad test collection name: {}", e))
}

/// Install a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}
