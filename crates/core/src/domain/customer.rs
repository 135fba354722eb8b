use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::classifier::{classify, ServiceLevel};
use crate::domain::user::{TerritoryId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    A,
    B,
    C,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::A, Tier::B, Tier::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            other => Err(format!("unknown customer tier `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub code: String,
    pub name: String,
    pub tier: Tier,
    pub monthly_revenue: Option<Decimal>,
    pub location: Option<GeoPoint>,
    pub territory_id: Option<TerritoryId>,
    pub required_visits_per_month: u32,
    pub response_time_hours: u32,
    pub created_by: UserId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Builds a customer with its tier derived from revenue. Missing service levels fall back
    /// to the tier defaults.
    pub fn new(
        id: CustomerId,
        input: NewCustomer,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        let tier = classify(input.monthly_revenue);
        let defaults = ServiceLevel::for_tier(tier);
        Self {
            id,
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            tier,
            monthly_revenue: input.monthly_revenue,
            location: input.location,
            territory_id: input.territory_id,
            required_visits_per_month: input
                .required_visits_per_month
                .unwrap_or(defaults.required_visits_per_month),
            response_time_hours: input.response_time_hours.unwrap_or(defaults.response_time_hours),
            created_by,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_monthly_revenue(&mut self, revenue: Option<Decimal>, now: DateTime<Utc>) {
        self.monthly_revenue = revenue;
        self.tier = classify(revenue);
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub code: String,
    pub name: String,
    pub monthly_revenue: Option<Decimal>,
    pub location: Option<GeoPoint>,
    pub territory_id: Option<TerritoryId>,
    pub required_visits_per_month: Option<u32>,
    pub response_time_hours: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub customer_id: CustomerId,
    pub name: String,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn belongs_to(&self, customer_id: &CustomerId) -> bool {
        &self.customer_id == customer_id
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}
