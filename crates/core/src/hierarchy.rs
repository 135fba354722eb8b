//! Guards over the manager tree.
//!
//! The tree is stored as a parent pointer per user. A manager assignment is checked by walking
//! the proposed manager's chain upward; the walk is bounded by [`MAX_HIERARCHY_DEPTH`] so a
//! corrupted tree can never loop forever.

use thiserror::Error;

use crate::domain::user::{Role, User, UserId};
use crate::errors::ErrorKind;

pub const MAX_HIERARCHY_DEPTH: usize = 16;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("user `{user_id}` not found")]
    UnknownUser { user_id: UserId },
    #[error("user `{user_id}` cannot be their own manager")]
    SelfManagement { user_id: UserId },
    #[error("assigning `{manager_id}` as manager of `{user_id}` would create a cycle")]
    ManagementCycle { user_id: UserId, manager_id: UserId },
    #[error("management chain above `{manager_id}` exceeds {max} levels")]
    DepthExceeded { manager_id: UserId, max: usize },
    #[error("user `{manager_id}` holds role `{role}` which cannot have subordinates")]
    RoleCannotManage { manager_id: UserId, role: Role },
    #[error("user `{user_id}` still has {count} direct report(s)")]
    HasDirectReports { user_id: UserId, count: usize },
}

impl HierarchyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownUser { .. } => ErrorKind::NotFound,
            _ => ErrorKind::Conflict,
        }
    }
}

/// Checks that `manager` may become the manager of `user_id`.
///
/// `chain` is the proposed manager's upward chain starting with the manager itself, as returned
/// by a bounded walk of at most `MAX_HIERARCHY_DEPTH + 1` entries.
pub fn validate_manager_assignment(
    user_id: &UserId,
    manager: &User,
    chain: &[UserId],
) -> Result<(), HierarchyError> {
    if &manager.id == user_id {
        return Err(HierarchyError::SelfManagement { user_id: user_id.clone() });
    }

    if !manager.role.can_manage() {
        return Err(HierarchyError::RoleCannotManage {
            manager_id: manager.id.clone(),
            role: manager.role,
        });
    }

    if chain.iter().any(|ancestor| ancestor == user_id) {
        return Err(HierarchyError::ManagementCycle {
            user_id: user_id.clone(),
            manager_id: manager.id.clone(),
        });
    }

    if chain.len() > MAX_HIERARCHY_DEPTH {
        return Err(HierarchyError::DepthExceeded {
            manager_id: manager.id.clone(),
            max: MAX_HIERARCHY_DEPTH,
        });
    }

    Ok(())
}

pub fn ensure_can_deactivate(user_id: &UserId, direct_reports: usize) -> Result<(), HierarchyError> {
    if direct_reports > 0 {
        return Err(HierarchyError::HasDirectReports {
            user_id: user_id.clone(),
            count: direct_reports,
        });
    }
    Ok(())
}

/// One level only: users whose manager pointer is `manager_id`.
pub fn direct_subordinates<'a, I>(manager_id: &UserId, users: I) -> Vec<&'a User>
where
    I: IntoIterator<Item = &'a User>,
{
    users.into_iter().filter(|user| user.reports_to(manager_id)).collect()
}

/// Walks parent pointers from `start` using `parent_of`, returning `start` followed by its
/// ancestors. Stops at the root, at a repeated id, or after `MAX_HIERARCHY_DEPTH + 1` entries.
pub fn walk_chain<F>(start: &UserId, mut parent_of: F) -> Vec<UserId>
where
    F: FnMut(&UserId) -> Option<UserId>,
{
    let mut chain = vec![start.clone()];
    while chain.len() <= MAX_HIERARCHY_DEPTH {
        let Some(current) = chain.last() else {
            break;
        };
        let Some(parent) = parent_of(current) else {
            break;
        };
        if chain.contains(&parent) {
            chain.push(parent);
            break;
        }
        chain.push(parent);
    }
    chain
}
