//! Capability checks for who may edit, decide on, coach, and view whose work.
//!
//! Every check answers with an [`AuthorizationResult`] so callers can log the reason and
//! surface a stable failure kind without re-deriving it.

use serde::{Deserialize, Serialize};

use crate::domain::user::{Role, User, UserId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorizationFailure {
    NotOwner { actor_id: UserId },
    NotDirectManager { actor_id: UserId, subject_id: UserId },
    RoleCannotManage { actor_id: UserId, role: Role },
    InactiveActor { actor_id: UserId },
}

impl AuthorizationFailure {
    fn reason(&self) -> String {
        match self {
            Self::NotOwner { actor_id } => {
                format!("user `{actor_id}` does not own this record")
            }
            Self::NotDirectManager { actor_id, subject_id } => {
                format!("user `{actor_id}` is not the direct manager of `{subject_id}`")
            }
            Self::RoleCannotManage { actor_id, role } => {
                format!("user `{actor_id}` holds role `{role}` which cannot manage others")
            }
            Self::InactiveActor { actor_id } => format!("user `{actor_id}` is inactive"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub allowed: bool,
    pub reason: String,
    pub failure: Option<AuthorizationFailure>,
}

impl AuthorizationResult {
    fn allow(reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into(), failure: None }
    }

    fn deny(failure: AuthorizationFailure) -> Self {
        Self { allowed: false, reason: failure.reason(), failure: Some(failure) }
    }

    pub fn into_result(self) -> Result<(), DomainError> {
        if self.allowed {
            Ok(())
        } else {
            Err(DomainError::Forbidden(self.reason))
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Authorization;

impl Authorization {
    /// Only the owning representative may change their own drafts.
    pub fn can_edit(actor_id: &UserId, owner_id: &UserId) -> AuthorizationResult {
        if actor_id != owner_id {
            return AuthorizationResult::deny(AuthorizationFailure::NotOwner {
                actor_id: actor_id.clone(),
            });
        }
        AuthorizationResult::allow(format!("user `{actor_id}` owns the record"))
    }

    /// Direct managers only; a skip-level manager is refused.
    pub fn can_approve(actor: &User, subject: &User) -> AuthorizationResult {
        Self::direct_management(actor, subject)
    }

    pub fn can_coach(actor: &User, subject: &User) -> AuthorizationResult {
        Self::direct_management(actor, subject)
    }

    /// Owners see their own work; direct managers see their subordinates' work.
    pub fn can_view(actor: &User, subject: &User) -> AuthorizationResult {
        if actor.id == subject.id {
            return AuthorizationResult::allow(format!("user `{}` owns the record", actor.id));
        }
        Self::direct_management(actor, subject)
    }

    fn direct_management(actor: &User, subject: &User) -> AuthorizationResult {
        if !actor.active {
            return AuthorizationResult::deny(AuthorizationFailure::InactiveActor {
                actor_id: actor.id.clone(),
            });
        }

        if !subject.reports_to(&actor.id) {
            return AuthorizationResult::deny(AuthorizationFailure::NotDirectManager {
                actor_id: actor.id.clone(),
                subject_id: subject.id.clone(),
            });
        }

        if !actor.role.can_manage() {
            return AuthorizationResult::deny(AuthorizationFailure::RoleCannotManage {
                actor_id: actor.id.clone(),
                role: actor.role,
            });
        }

        AuthorizationResult::allow(format!(
            "user `{}` ({}) directly manages `{}`",
            actor.id, actor.role, subject.id
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Authorization, AuthorizationFailure};
    use crate::domain::user::{Role, User, UserId};
    use crate::errors::DomainError;

    fn user(id: &str, role: Role, manager: Option<&str>) -> User {
        User {
            id: UserId(id.to_string()),
            username: id.to_string(),
            full_name: id.to_uppercase(),
            role,
            manager_id: manager.map(|value| UserId(value.to_string())),
            territory_id: None,
            team_id: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn direct_manager_may_approve() {
        let manager = user("mgr", Role::SalesManager, Some("dir"));
        let rep = user("rep", Role::SalesRepresentative, Some("mgr"));

        let result = Authorization::can_approve(&manager, &rep);
        assert!(result.allowed, "{}", result.reason);
        assert!(result.failure.is_none());
    }

    #[test]
    fn skip_level_manager_is_refused() {
        let director = user("dir", Role::SalesDirector, None);
        let rep = user("rep", Role::SalesRepresentative, Some("mgr"));

        let result = Authorization::can_approve(&director, &rep);
        assert!(!result.allowed);
        assert!(matches!(result.failure, Some(AuthorizationFailure::NotDirectManager { .. })));
        assert!(matches!(result.into_result(), Err(DomainError::Forbidden(_))));
    }

    #[test]
    fn representative_role_cannot_approve_even_with_reports() {
        let senior_rep = user("rep-a", Role::SalesRepresentative, Some("mgr"));
        let junior = user("rep-b", Role::SalesRepresentative, Some("rep-a"));

        let result = Authorization::can_approve(&senior_rep, &junior);
        assert!(matches!(result.failure, Some(AuthorizationFailure::RoleCannotManage { .. })));
    }

    #[test]
    fn inactive_manager_is_refused() {
        let mut manager = user("mgr", Role::Supervisor, None);
        manager.active = false;
        let rep = user("rep", Role::SalesRepresentative, Some("mgr"));

        let result = Authorization::can_coach(&manager, &rep);
        assert!(matches!(result.failure, Some(AuthorizationFailure::InactiveActor { .. })));
    }

    #[test]
    fn only_owner_may_edit() {
        let owner = UserId("rep".to_string());
        assert!(Authorization::can_edit(&owner, &owner).allowed);

        let other = Authorization::can_edit(&UserId("rep-2".to_string()), &owner);
        assert!(!other.allowed);
        assert_eq!(other.reason, "user `rep-2` does not own this record");
    }

    #[test]
    fn owner_and_direct_manager_can_view() {
        let manager = user("mgr", Role::SalesManager, None);
        let rep = user("rep", Role::SalesRepresentative, Some("mgr"));
        let peer = user("peer", Role::SalesRepresentative, Some("mgr"));

        assert!(Authorization::can_view(&rep, &rep).allowed);
        assert!(Authorization::can_view(&manager, &rep).allowed);
        assert!(!Authorization::can_view(&peer, &rep).allowed);
    }

    #[test]
    fn failure_serializes_with_kind_tag() {
        let failure = AuthorizationFailure::NotOwner { actor_id: UserId("rep-2".to_string()) };
        let value = serde_json::to_value(&failure).expect("serialize");
        assert_eq!(value["kind"], "not_owner");
        assert_eq!(value["actor_id"], "rep-2");
    }
}
