//! Manager scoping for every team-facing query.

use std::sync::Arc;

use callplan_core::domain::user::{TerritoryId, User, UserId};
use callplan_core::errors::{ApplicationError, DomainError};
use callplan_db::repositories::UserRepository;

#[derive(Clone)]
pub struct HierarchyResolver {
    users: Arc<dyn UserRepository>,
}

impl HierarchyResolver {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Loads a user regardless of the active flag.
    pub async fn require_user(&self, user_id: &UserId) -> Result<User, ApplicationError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id.0.clone()).into())
    }

    /// Users whose manager pointer is `manager_id`. One level only.
    pub async fn direct_subordinates(
        &self,
        manager_id: &UserId,
    ) -> Result<Vec<User>, ApplicationError> {
        self.require_user(manager_id).await?;
        Ok(self.users.list_direct_reports(manager_id).await?)
    }

    pub async fn subordinate_ids(&self, manager_id: &UserId) -> Result<Vec<UserId>, ApplicationError> {
        Ok(self.direct_subordinates(manager_id).await?.into_iter().map(|user| user.id).collect())
    }

    /// Direct membership only; a skip-level manager is not a manager of the user here.
    pub async fn is_manager_of(
        &self,
        manager_id: &UserId,
        user_id: &UserId,
    ) -> Result<bool, ApplicationError> {
        self.require_user(manager_id).await?;
        let user = self.require_user(user_id).await?;
        Ok(user.reports_to(manager_id))
    }

    /// Distinct territories covered by `members`, in first-seen order.
    pub fn territories_of(members: &[User]) -> Vec<TerritoryId> {
        let mut territories: Vec<TerritoryId> = Vec::new();
        for territory in members.iter().filter_map(|member| member.territory_id.as_ref()) {
            if !territories.contains(territory) {
                territories.push(territory.clone());
            }
        }
        territories
    }
}
