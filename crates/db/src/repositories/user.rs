use sqlx::sqlite::SqliteRow;

use callplan_core::domain::user::{Role, TeamId, TerritoryId, User, UserId};
use callplan_core::hierarchy::MAX_HIERARCHY_DEPTH;

use super::rows::{get, parsed, timestamp};
use super::{RepositoryError, UserRepository};
use crate::DbPool;

const USER_COLUMNS: &str =
    "id, username, full_name, role, manager_id, territory_id, team_id, active, created_at, updated_at";

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    let role: String = get(row, "role")?;
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    Ok(User {
        id: UserId(get(row, "id")?),
        username: get(row, "username")?,
        full_name: get(row, "full_name")?,
        role: parsed::<Role>(&role, "role")?,
        manager_id: get::<Option<String>>(row, "manager_id")?.map(UserId),
        territory_id: get::<Option<String>>(row, "territory_id")?.map(TerritoryId),
        team_id: get::<Option<String>>(row, "team_id")?.map(TeamId),
        active: get(row, "active")?,
        created_at: timestamp(&created_at, "created_at")?,
        updated_at: timestamp(&updated_at, "updated_at")?,
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, username, full_name, role, manager_id, territory_id, team_id,
                                active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 username = excluded.username,
                 full_name = excluded.full_name,
                 role = excluded.role,
                 manager_id = excluded.manager_id,
                 territory_id = excluded.territory_id,
                 team_id = excluded.team_id,
                 active = excluded.active,
                 updated_at = excluded.updated_at",
        )
        .bind(&user.id.0)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.manager_id.as_ref().map(|id| id.0.as_str()))
        .bind(user.territory_id.as_ref().map(|id| id.0.as_str()))
        .bind(user.team_id.as_ref().map(|id| id.0.as_str()))
        .bind(user.active)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_direct_reports(&self, manager_id: &UserId) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE manager_id = ? ORDER BY full_name, id"
        ))
        .bind(&manager_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn count_direct_reports(&self, manager_id: &UserId) -> Result<usize, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users WHERE manager_id = ?")
            .bind(&manager_id.0)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = get(&row, "count")?;
        Ok(count.max(0) as usize)
    }

    async fn manager_chain(&self, start: &UserId) -> Result<Vec<UserId>, RepositoryError> {
        let rows = sqlx::query(
            "WITH RECURSIVE chain(id, manager_id, depth) AS (
                 SELECT id, manager_id, 0 FROM users WHERE id = ?
                 UNION ALL
                 SELECT u.id, u.manager_id, chain.depth + 1
                 FROM users u JOIN chain ON u.id = chain.manager_id
                 WHERE chain.depth < ?
             )
             SELECT id FROM chain ORDER BY depth",
        )
        .bind(&start.0)
        .bind(MAX_HIERARCHY_DEPTH as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| get::<String>(row, "id").map(UserId)).collect()
    }

    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM users WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use callplan_core::domain::user::{Role, TerritoryId, User, UserId};

    use super::SqlUserRepository;
    use crate::repositories::UserRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn user(id: &str, role: Role, manager: Option<&str>) -> User {
        User {
            id: UserId(id.to_string()),
            username: id.to_string(),
            full_name: format!("User {id}"),
            role,
            manager_id: manager.map(|value| UserId(value.to_string())),
            territory_id: Some(TerritoryId("jakarta".to_string())),
            team_id: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let repo = SqlUserRepository::new(setup().await);
        let ceo = user("ceo", Role::Ceo, None);

        repo.save(ceo.clone()).await.expect("save");
        let found = repo.find_by_id(&ceo.id).await.expect("find").expect("present");

        assert_eq!(found.role, Role::Ceo);
        assert_eq!(found.territory_id, ceo.territory_id);
        assert_eq!(repo.find_by_username("ceo").await.expect("by name").map(|u| u.id), Some(ceo.id));
    }

    #[tokio::test]
    async fn direct_reports_and_chain_follow_manager_pointers() {
        let repo = SqlUserRepository::new(setup().await);
        repo.save(user("ceo", Role::Ceo, None)).await.expect("ceo");
        repo.save(user("dir", Role::SalesDirector, Some("ceo"))).await.expect("dir");
        repo.save(user("mgr", Role::SalesManager, Some("dir"))).await.expect("mgr");
        repo.save(user("rep-1", Role::SalesRepresentative, Some("mgr"))).await.expect("rep-1");
        repo.save(user("rep-2", Role::SalesRepresentative, Some("mgr"))).await.expect("rep-2");

        let reports = repo.list_direct_reports(&UserId("mgr".to_string())).await.expect("list");
        assert_eq!(reports.len(), 2);
        assert_eq!(repo.count_direct_reports(&UserId("dir".to_string())).await.expect("count"), 1);

        let chain = repo.manager_chain(&UserId("rep-1".to_string())).await.expect("chain");
        let ids: Vec<&str> = chain.iter().map(|id| id.0.as_str()).collect();
        assert_eq!(ids, vec!["rep-1", "mgr", "dir", "ceo"]);

        assert!(repo.manager_chain(&UserId("ghost".to_string())).await.expect("chain").is_empty());
    }

    #[tokio::test]
    async fn deleting_a_manager_clears_subordinate_pointers() {
        let repo = SqlUserRepository::new(setup().await);
        repo.save(user("mgr", Role::SalesManager, None)).await.expect("mgr");
        repo.save(user("rep-1", Role::SalesRepresentative, Some("mgr"))).await.expect("rep");

        assert!(repo.delete(&UserId("mgr".to_string())).await.expect("delete"));
        assert!(!repo.delete(&UserId("mgr".to_string())).await.expect("second delete"));

        let rep = repo.find_by_id(&UserId("rep-1".to_string())).await.expect("find").expect("rep");
        assert_eq!(rep.manager_id, None);
    }
}
