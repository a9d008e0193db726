#![allow(dead_code)]

use std::sync::{Arc, Once};

use anyhow::Result;
use uuid::Uuid;

use gtree_core::database::repository::GrantRepository;
use gtree_core::database::MemoryStore;
use gtree_core::domain::entities::{NewTree, NewUser, Tree, User};
use gtree_core::services::Services;

static TRACING: Once = Once::new();

/// Route test logs through the test writer. `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Services over a fresh in-memory store that enforces references, with a
/// handle on the store for row-level assertions.
pub struct TestApp {
    pub store: MemoryStore,
    pub grants: Arc<GrantRepository<MemoryStore>>,
    pub services: Services<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        init_tracing();
        let store = MemoryStore::with_references();
        Self {
            grants: Arc::new(GrantRepository::new(store.clone())),
            services: Services::new(store.clone()),
            store,
        }
    }

    pub async fn user(&self, username: &str) -> Result<User> {
        let draft = NewUser::new(username, format!("{}@example.com", username), "test-hash")?;
        Ok(self.services.users.register(draft).await?)
    }

    pub async fn tree(&self, owner: Uuid, name: &str) -> Result<Tree> {
        Ok(self.services.trees.create_tree(owner, NewTree::new(name, None)?).await?)
    }
}
