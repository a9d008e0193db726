//! Guarded use cases composed from repositories and the access guard.

use std::sync::Arc;

use crate::authorization::AccessGuard;
use crate::database::repository::GrantRepository;
use crate::database::store::Store;

pub mod individual_service;
pub mod relation_service;
pub mod tree_service;
pub mod user_service;

pub use individual_service::IndividualService;
pub use relation_service::RelationService;
pub use tree_service::TreeService;
pub use user_service::UserService;

/// Guard shared by every tree-scoped service.
pub type TreeGuard<S> = AccessGuard<Arc<GrantRepository<S>>>;

/// All services over one store, sharing a single grant repository.
pub struct Services<S> {
    pub users: UserService<S>,
    pub trees: TreeService<S>,
    pub individuals: IndividualService<S>,
    pub relations: RelationService<S>,
}

impl<S: Store + Clone> Services<S> {
    pub fn new(store: S) -> Self {
        let grants = Arc::new(GrantRepository::new(store.clone()));
        Self {
            users: UserService::new(store.clone()),
            trees: TreeService::new(store.clone(), grants.clone()),
            individuals: IndividualService::new(store.clone(), grants.clone()),
            relations: RelationService::new(store, grants),
        }
    }
}
