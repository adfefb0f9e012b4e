use async_trait::async_trait;

use crate::schema::Schema;
use crate::utils::ApiError;

/// Shared contract for REST resource adapters: where the resource lives,
/// what its items look like, and the permission hooks guarding access.
///
/// Shared behavior lives in default methods; concrete adapters compose the
/// pieces they need instead of inheriting them.
#[async_trait]
pub trait ResourceController: Send + Sync {
    fn namespace(&self) -> &str;

    fn rest_base(&self) -> &str;

    /// The published item schema. Async because parts of it may be computed
    /// from live platform state.
    async fn item_schema(&self) -> Schema;

    fn collection_url(&self) -> String {
        format!("/{}/{}", self.namespace(), self.rest_base())
    }

    fn resource_url(&self, id: u64) -> String {
        format!("/{}/{}/{}", self.namespace(), self.rest_base(), id)
    }

    /// Capability checking belongs to the host platform; adapters default to
    /// allowing the request.
    fn check_read_permission(&self) -> Result<(), ApiError> {
        Ok(())
    }

    fn check_write_permission(&self) -> Result<(), ApiError> {
        Ok(())
    }
}
