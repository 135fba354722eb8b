use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use callplan_core::domain::customer::{Contact, ContactId, Customer, CustomerId, GeoPoint, NewCustomer};
use callplan_core::domain::plan::{NewPlan, PlanId, PreCallPlan};
use callplan_core::domain::user::{Role, TeamId, TerritoryId, User, UserId};

use crate::connection::DbPool;
use crate::repositories::{
    CustomerRepository, PlanRepository, RepositoryError, SqlCustomerRepository,
    SqlPlanRepository, SqlUserRepository, UserRepository,
};

/// (id, full name, role, manager, territory)
const SEED_USERS: &[(&str, &str, Role, Option<&str>, Option<&str>)] = &[
    ("usr-ceo", "Hendra Wijaya", Role::Ceo, None, None),
    ("usr-director", "Ratna Kusuma", Role::SalesDirector, Some("usr-ceo"), None),
    ("usr-manager", "Budi Santoso", Role::SalesManager, Some("usr-director"), None),
    ("usr-rep-andi", "Andi Pratama", Role::SalesRepresentative, Some("usr-manager"), Some("jkt-01")),
    ("usr-rep-sari", "Sari Lestari", Role::SalesRepresentative, Some("usr-manager"), Some("jkt-02")),
];

/// (id, code, name, monthly revenue, territory)
const SEED_CUSTOMERS: &[(&str, &str, &str, Option<i64>, &str)] = &[
    ("cust-rs-medika", "RSM-001", "RS Medika Utama", Some(750_000), "jkt-01"),
    ("cust-apotek-sehat", "APS-014", "Apotek Sehat Sentosa", Some(240_000), "jkt-01"),
    ("cust-klinik-harapan", "KLH-203", "Klinik Harapan Bunda", Some(45_000), "jkt-02"),
    ("cust-toko-obat", "TOB-310", "Toko Obat Makmur", None, "jkt-02"),
];

const SEED_CONTACT_ID: &str = "contact-rs-medika-pharmacist";
const SEED_PLAN_ID: &str = "plan-demo-pending";

/// Deterministic demo organisation: one reporting line from CEO to two representatives, a
/// customer per tier band, and a plan waiting for the manager's decision.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Upserts the dataset. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let users = SqlUserRepository::new(pool.clone());
        let customers = SqlCustomerRepository::new(pool.clone());
        let plans = SqlPlanRepository::new(pool.clone());
        let at = seeded_at();

        for (id, full_name, role, manager, territory) in SEED_USERS {
            users
                .save(User {
                    id: UserId((*id).to_string()),
                    username: id.trim_start_matches("usr-").to_string(),
                    full_name: (*full_name).to_string(),
                    role: *role,
                    manager_id: manager.map(|value| UserId(value.to_string())),
                    territory_id: territory.map(|value| TerritoryId(value.to_string())),
                    team_id: Some(TeamId("team-jakarta".to_string())),
                    active: true,
                    created_at: at,
                    updated_at: at,
                })
                .await?;
        }

        for (id, code, name, revenue, territory) in SEED_CUSTOMERS {
            customers
                .save(Customer::new(
                    CustomerId((*id).to_string()),
                    NewCustomer {
                        code: (*code).to_string(),
                        name: (*name).to_string(),
                        monthly_revenue: revenue.map(Decimal::from),
                        location: Some(GeoPoint { lat: -6.2088, lng: 106.8456 }),
                        territory_id: Some(TerritoryId((*territory).to_string())),
                        ..NewCustomer::default()
                    },
                    UserId("usr-manager".to_string()),
                    at,
                ))
                .await?;
        }

        customers
            .save_contact(Contact {
                id: ContactId(SEED_CONTACT_ID.to_string()),
                customer_id: CustomerId("cust-rs-medika".to_string()),
                name: "dr. Maya Anggraini".to_string(),
                title: Some("Head Pharmacist".to_string()),
                phone: Some("+62-21-555-0101".to_string()),
                email: None,
                is_primary: true,
                created_at: at,
            })
            .await?;

        let plan_id = PlanId(SEED_PLAN_ID.to_string());
        let plan_seeded = if plans.find_by_id(&plan_id).await?.is_none() {
            let mut plan = PreCallPlan::draft(
                plan_id,
                UserId("usr-rep-andi".to_string()),
                NewPlan {
                    customer_id: CustomerId("cust-rs-medika".to_string()),
                    contact_id: Some(ContactId(SEED_CONTACT_ID.to_string())),
                    plan_date: NaiveDate::from_ymd_opt(2025, 1, 13).unwrap_or_default(),
                    objectives: Some("Present the new antihypertensive formulary data".to_string()),
                    planned_activities: vec!["detailing".to_string(), "sampling".to_string()],
                },
                at,
            );
            if plan.submit(at).is_ok() {
                plans.insert(plan).await?;
            }
            true
        } else {
            false
        };

        Ok(SeedResult {
            users: SEED_USERS.len(),
            customers: SEED_CUSTOMERS.len(),
            contacts: 1,
            plans: usize::from(plan_seeded),
        })
    }

    /// Checks that every seeded row is present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let users = SqlUserRepository::new(pool.clone());
        let customers = SqlCustomerRepository::new(pool.clone());
        let plans = SqlPlanRepository::new(pool.clone());
        let mut checks = Vec::new();

        for (id, ..) in SEED_USERS {
            checks.push((*id, users.find_by_id(&UserId((*id).to_string())).await?.is_some()));
        }
        for (id, ..) in SEED_CUSTOMERS {
            checks.push((*id, customers.find_by_id(&CustomerId((*id).to_string())).await?.is_some()));
        }
        checks.push((
            SEED_CONTACT_ID,
            customers.find_contact(&ContactId(SEED_CONTACT_ID.to_string())).await?.is_some(),
        ));
        checks.push((
            SEED_PLAN_ID,
            plans.find_by_id(&PlanId(SEED_PLAN_ID.to_string())).await?.is_some(),
        ));

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded rows; cascades take the contact and plan with them.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for (id, ..) in SEED_CUSTOMERS {
            sqlx::query("DELETE FROM customers WHERE id = ?").bind(*id).execute(&mut *tx).await?;
        }
        for (id, ..) in SEED_USERS.iter().rev() {
            sqlx::query("DELETE FROM users WHERE id = ?").bind(*id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).single().unwrap_or_else(Utc::now)
}

#[derive(Debug)]
pub struct SeedResult {
    pub users: usize,
    pub customers: usize,
    pub contacts: usize,
    pub plans: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
