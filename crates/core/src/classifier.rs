//! Customer tiering by monthly revenue.
//!
//! Bands: revenue above 500,000 is tier A, 100,000 through 500,000 inclusive is tier B, and
//! anything below 100,000 is tier C. A customer with no recorded revenue is tier C.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::Tier;

const TIER_A_FLOOR_EXCLUSIVE: i64 = 500_000;
const TIER_B_FLOOR: i64 = 100_000;

pub fn classify(monthly_revenue: Option<Decimal>) -> Tier {
    let Some(revenue) = monthly_revenue else {
        return Tier::C;
    };

    if revenue > Decimal::from(TIER_A_FLOOR_EXCLUSIVE) {
        Tier::A
    } else if revenue >= Decimal::from(TIER_B_FLOOR) {
        Tier::B
    } else {
        Tier::C
    }
}

/// Default visit cadence and response commitment for a tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLevel {
    pub required_visits_per_month: u32,
    pub response_time_hours: u32,
}

impl ServiceLevel {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::A => Self { required_visits_per_month: 4, response_time_hours: 24 },
            Tier::B => Self { required_visits_per_month: 2, response_time_hours: 48 },
            Tier::C => Self { required_visits_per_month: 1, response_time_hours: 72 },
        }
    }
}
