use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerritoryId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Ceo,
    SalesDirector,
    SalesManager,
    MarketingManager,
    ProductManager,
    Supervisor,
    SalesRepresentative,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ceo => "ceo",
            Self::SalesDirector => "sales_director",
            Self::SalesManager => "sales_manager",
            Self::MarketingManager => "marketing_manager",
            Self::ProductManager => "product_manager",
            Self::Supervisor => "supervisor",
            Self::SalesRepresentative => "sales_representative",
        }
    }

    /// Roles allowed to hold direct subordinates and decide on their work.
    pub fn can_manage(&self) -> bool {
        !matches!(self, Self::SalesRepresentative)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "ceo" => Ok(Self::Ceo),
            "sales_director" => Ok(Self::SalesDirector),
            "sales_manager" => Ok(Self::SalesManager),
            "marketing_manager" => Ok(Self::MarketingManager),
            "product_manager" => Ok(Self::ProductManager),
            "supervisor" => Ok(Self::Supervisor),
            "sales_representative" | "sr" => Ok(Self::SalesRepresentative),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub manager_id: Option<UserId>,
    pub territory_id: Option<TerritoryId>,
    pub team_id: Option<TeamId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn reports_to(&self, manager_id: &UserId) -> bool {
        self.manager_id.as_ref() == Some(manager_id)
    }
}
