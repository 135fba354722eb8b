//! Administrative changes to the manager tree. Credentials live outside this system.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use callplan_core::audit::AuditCategory;
use callplan_core::domain::user::{Role, TeamId, TerritoryId, User, UserId};
use callplan_core::errors::{ApplicationError, DomainError};
use callplan_core::hierarchy::{ensure_can_deactivate, validate_manager_assignment};

use crate::context::{new_id, Caller, WorkflowContext};
use crate::hierarchy::HierarchyResolver;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub manager_id: Option<UserId>,
    pub territory_id: Option<TerritoryId>,
    pub team_id: Option<TeamId>,
}

#[derive(Clone)]
pub struct UserAdministration {
    context: WorkflowContext,
    hierarchy: HierarchyResolver,
}

impl UserAdministration {
    pub fn new(context: WorkflowContext, hierarchy: HierarchyResolver) -> Self {
        Self { context, hierarchy }
    }

    pub async fn register(&self, caller: &Caller, input: NewUser) -> Result<User, ApplicationError> {
        let result = self.register_inner(input).await;
        let subject = result.as_ref().ok().map(|user| user.id.0.clone());
        self.context.record(
            caller,
            "hierarchy.user_registered",
            AuditCategory::Hierarchy,
            subject.as_deref(),
            result,
        )
    }

    async fn register_inner(&self, input: NewUser) -> Result<User, ApplicationError> {
        let username = input.username.trim();
        if username.is_empty() {
            return Err(DomainError::Validation("username is required".to_owned()).into());
        }
        if input.full_name.trim().is_empty() {
            return Err(DomainError::Validation("full name is required".to_owned()).into());
        }
        if self.context.users.find_by_username(username).await?.is_some() {
            return Err(
                DomainError::Conflict(format!("username `{username}` is already taken")).into()
            );
        }

        let id = UserId(new_id());
        if let Some(manager_id) = &input.manager_id {
            self.check_assignment(&id, manager_id).await?;
        }

        let now = Utc::now();
        let user = User {
            id,
            username: username.to_owned(),
            full_name: input.full_name.trim().to_owned(),
            role: input.role,
            manager_id: input.manager_id,
            territory_id: input.territory_id,
            team_id: input.team_id,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.context.users.save(user.clone()).await?;
        Ok(user)
    }

    /// Moves `user_id` under `manager_id`, or detaches it when `None`.
    pub async fn assign_manager(
        &self,
        caller: &Caller,
        user_id: &UserId,
        manager_id: Option<UserId>,
    ) -> Result<User, ApplicationError> {
        let result = self.assign_manager_inner(user_id, manager_id).await;
        self.context.record(
            caller,
            "hierarchy.manager_assigned",
            AuditCategory::Hierarchy,
            Some(&user_id.0),
            result,
        )
    }

    async fn assign_manager_inner(
        &self,
        user_id: &UserId,
        manager_id: Option<UserId>,
    ) -> Result<User, ApplicationError> {
        let mut user = self.hierarchy.require_user(user_id).await?;
        if let Some(manager_id) = &manager_id {
            self.check_assignment(user_id, manager_id).await?;
        }
        user.manager_id = manager_id;
        user.updated_at = Utc::now();
        self.context.users.save(user.clone()).await?;
        Ok(user)
    }

    async fn check_assignment(
        &self,
        user_id: &UserId,
        manager_id: &UserId,
    ) -> Result<(), ApplicationError> {
        let manager = self.hierarchy.require_user(manager_id).await?;
        let chain = self.context.users.manager_chain(manager_id).await?;
        validate_manager_assignment(user_id, &manager, &chain).map_err(DomainError::from)?;
        Ok(())
    }

    /// Refused while the user still has direct reports.
    pub async fn deactivate(&self, caller: &Caller, user_id: &UserId) -> Result<User, ApplicationError> {
        let result = self.deactivate_inner(user_id).await;
        self.context.record(
            caller,
            "hierarchy.user_deactivated",
            AuditCategory::Hierarchy,
            Some(&user_id.0),
            result,
        )
    }

    async fn deactivate_inner(&self, user_id: &UserId) -> Result<User, ApplicationError> {
        let mut user = self.hierarchy.require_user(user_id).await?;
        let direct_reports = self.context.users.count_direct_reports(user_id).await?;
        ensure_can_deactivate(user_id, direct_reports).map_err(DomainError::from)?;
        user.active = false;
        user.updated_at = Utc::now();
        self.context.users.save(user.clone()).await?;
        Ok(user)
    }

    /// Hard delete. Owned plans and reports go with the user; subordinates lose their manager.
    pub async fn delete(&self, caller: &Caller, user_id: &UserId) -> Result<(), ApplicationError> {
        let result = self.delete_inner(user_id).await;
        self.context.record(
            caller,
            "hierarchy.user_deleted",
            AuditCategory::Hierarchy,
            Some(&user_id.0),
            result,
        )
    }

    async fn delete_inner(&self, user_id: &UserId) -> Result<(), ApplicationError> {
        self.hierarchy.require_user(user_id).await?;
        // Reports first: they may anchor on the user's plans.
        self.context.reports.delete_for_representative(user_id).await?;
        self.context.plans.delete_for_representative(user_id).await?;
        if !self.context.users.delete(user_id).await? {
            return Err(DomainError::not_found("user", user_id.0.clone()).into());
        }
        Ok(())
    }
}
