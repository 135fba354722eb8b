use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};

use callplan_core::domain::customer::{
    Contact, ContactId, Customer, CustomerId, GeoPoint, Tier,
};
use callplan_core::domain::user::{TerritoryId, UserId};

use super::rows::{get, parsed, timestamp};
use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

const CUSTOMER_COLUMNS: &str = "id, code, name, tier, monthly_revenue, latitude, longitude, \
     territory_id, required_visits_per_month, response_time_hours, created_by, active, \
     created_at, updated_at";

const CONTACT_COLUMNS: &str =
    "id, customer_id, name, title, phone, email, is_primary, created_at";

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_customer(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    let tier: String = get(row, "tier")?;
    let revenue: Option<String> = get(row, "monthly_revenue")?;
    let latitude: Option<f64> = get(row, "latitude")?;
    let longitude: Option<f64> = get(row, "longitude")?;
    let visits: i64 = get(row, "required_visits_per_month")?;
    let response: i64 = get(row, "response_time_hours")?;
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    let monthly_revenue = revenue
        .map(|raw| {
            Decimal::from_str(&raw)
                .map_err(|e| RepositoryError::Decode(format!("monthly_revenue: {e}")))
        })
        .transpose()?;

    Ok(Customer {
        id: CustomerId(get(row, "id")?),
        code: get(row, "code")?,
        name: get(row, "name")?,
        tier: parsed::<Tier>(&tier, "tier")?,
        monthly_revenue,
        location: latitude.zip(longitude).map(|(lat, lng)| GeoPoint { lat, lng }),
        territory_id: get::<Option<String>>(row, "territory_id")?.map(TerritoryId),
        required_visits_per_month: u32::try_from(visits)
            .map_err(|e| RepositoryError::Decode(format!("required_visits_per_month: {e}")))?,
        response_time_hours: u32::try_from(response)
            .map_err(|e| RepositoryError::Decode(format!("response_time_hours: {e}")))?,
        created_by: UserId(get(row, "created_by")?),
        active: get(row, "active")?,
        created_at: timestamp(&created_at, "created_at")?,
        updated_at: timestamp(&updated_at, "updated_at")?,
    })
}

fn row_to_contact(row: &SqliteRow) -> Result<Contact, RepositoryError> {
    let created_at: String = get(row, "created_at")?;
    Ok(Contact {
        id: ContactId(get(row, "id")?),
        customer_id: CustomerId(get(row, "customer_id")?),
        name: get(row, "name")?,
        title: get(row, "title")?,
        phone: get(row, "phone")?,
        email: get(row, "email")?,
        is_primary: get(row, "is_primary")?,
        created_at: timestamp(&created_at, "created_at")?,
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE code = ?"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customers (id, code, name, tier, monthly_revenue, latitude, longitude,
                                    territory_id, required_visits_per_month, response_time_hours,
                                    created_by, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 code = excluded.code,
                 name = excluded.name,
                 tier = excluded.tier,
                 monthly_revenue = excluded.monthly_revenue,
                 latitude = excluded.latitude,
                 longitude = excluded.longitude,
                 territory_id = excluded.territory_id,
                 required_visits_per_month = excluded.required_visits_per_month,
                 response_time_hours = excluded.response_time_hours,
                 active = excluded.active,
                 updated_at = excluded.updated_at",
        )
        .bind(&customer.id.0)
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(customer.tier.as_str())
        .bind(customer.monthly_revenue.map(|value| value.to_string()))
        .bind(customer.location.map(|point| point.lat))
        .bind(customer.location.map(|point| point.lng))
        .bind(customer.territory_id.as_ref().map(|id| id.0.as_str()))
        .bind(i64::from(customer.required_visits_per_month))
        .bind(i64::from(customer.response_time_hours))
        .bind(&customer.created_by.0)
        .bind(customer.active)
        .bind(customer.created_at.to_rfc3339())
        .bind(customer.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active_in_territories(
        &self,
        territories: &[TerritoryId],
    ) -> Result<Vec<Customer>, RepositoryError> {
        if territories.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE active = 1 AND territory_id IN ("
        ));
        let mut separated = builder.separated(", ");
        for territory in territories {
            separated.push_bind(territory.0.clone());
        }
        separated.push_unseparated(") ORDER BY code");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_customer).collect()
    }

    async fn find_contact(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_contact).transpose()
    }

    async fn list_contacts(&self, customer_id: &CustomerId) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE customer_id = ?
             ORDER BY is_primary DESC, name"
        ))
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_contact).collect()
    }

    async fn save_contact(&self, contact: Contact) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if contact.is_primary {
            sqlx::query("UPDATE contacts SET is_primary = 0 WHERE customer_id = ? AND id <> ?")
                .bind(&contact.customer_id.0)
                .bind(&contact.id.0)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO contacts (id, customer_id, name, title, phone, email, is_primary, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 title = excluded.title,
                 phone = excluded.phone,
                 email = excluded.email,
                 is_primary = excluded.is_primary",
        )
        .bind(&contact.id.0)
        .bind(&contact.customer_id.0)
        .bind(&contact.name)
        .bind(&contact.title)
        .bind(&contact.phone)
        .bind(&contact.email)
        .bind(contact.is_primary)
        .bind(contact.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
