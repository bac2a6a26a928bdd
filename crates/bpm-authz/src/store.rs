//! Grant storage gateway

use crate::check::AuthorizationCheck;
use crate::query::AuthorizationQuery;
use bpm_types::{Authorization, EngineResult, Resource};

/// Persistence of authorization grants.
///
/// Implementations answer [`AuthorizationStore::is_user_authorized`] in a single
/// query; in-memory stores can delegate to [`crate::evaluator::evaluate`].
pub trait AuthorizationStore: Send + Sync {
    fn insert_authorization(&self, authorization: Authorization) -> EngineResult<()>;

    fn update_authorization(&self, authorization: Authorization) -> EngineResult<()>;

    /// Remove a grant, returning it if it existed
    fn delete_authorization(&self, id: &str) -> EngineResult<Option<Authorization>>;

    fn find_authorization_by_id(&self, id: &str) -> EngineResult<Option<Authorization>>;

    /// Select grants matching `query`, honouring its authorization part
    fn select_authorizations(&self, query: &AuthorizationQuery) -> EngineResult<Vec<Authorization>>;

    /// Delete every grant naming exactly `resource_id` on `resource`
    fn delete_authorizations_by_resource_id(
        &self,
        resource: Resource,
        resource_id: &str,
    ) -> EngineResult<usize>;

    /// True if any of the OR-combined checks is satisfied for the subject
    fn is_user_authorized(&self, check: &AuthorizationCheck) -> EngineResult<bool>;
}
