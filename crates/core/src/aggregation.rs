//! Manager dashboard math.
//!
//! Everything here is a pure function of already-loaded rows. Callers scope the inputs to a
//! manager's direct subordinates; the functions never widen that scope.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::customer::{Customer, CustomerId, Tier};
use crate::domain::report::{CallReport, ReportStatus};
use crate::domain::user::{User, UserId};
use crate::errors::DomainError;

/// Inclusive calendar range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, DomainError> {
        if to < from {
            return Err(DomainError::Validation(format!(
                "date range end {to} precedes its start {from}"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierCoverage {
    pub tier: Tier,
    pub total: usize,
    pub visited: usize,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbcCoverage {
    pub total: usize,
    pub visited: usize,
    pub percentage: f64,
    pub by_tier: Vec<TierCoverage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberPerformance {
    pub user_id: UserId,
    pub full_name: String,
    pub total_calls: usize,
    pub planned_calls: usize,
    pub unplanned_calls: usize,
    pub planned_ratio: f64,
    pub abc_customers_visited: usize,
    pub average_duration_minutes: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub manager_id: UserId,
    pub range: Option<DateRange>,
    pub total_calls: usize,
    pub today_calls: usize,
    pub month_calls: usize,
    pub pending_approvals: usize,
    pub abc_coverage: AbcCoverage,
    pub team_performance: Vec<MemberPerformance>,
}

pub struct DashboardInput<'a> {
    pub manager_id: &'a UserId,
    pub subordinates: &'a [User],
    /// Reports owned by the subordinates. Drafts are ignored.
    pub reports: &'a [CallReport],
    /// Active customers in the subordinates' territories.
    pub customers: &'a [Customer],
    pub pending_approvals: usize,
    pub range: Option<DateRange>,
    pub today: NaiveDate,
}

/// `part / whole` as a percentage rounded to two places; zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / whole as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn compute_dashboard(input: DashboardInput<'_>) -> DashboardSnapshot {
    let members: HashSet<&UserId> = input.subordinates.iter().map(|user| &user.id).collect();
    let submitted: Vec<&CallReport> = input
        .reports
        .iter()
        .filter(|report| report.status == ReportStatus::Submitted)
        .filter(|report| members.contains(&report.sr_id))
        .collect();

    let in_range: Vec<&CallReport> = submitted
        .iter()
        .copied()
        .filter(|report| input.range.map_or(true, |range| range.contains(report.call_date)))
        .collect();

    let today_calls = submitted.iter().filter(|report| report.call_date == input.today).count();
    let month_calls = submitted
        .iter()
        .filter(|report| {
            report.call_date.year() == input.today.year()
                && report.call_date.month() == input.today.month()
        })
        .count();

    let tiers: HashMap<&CustomerId, Tier> =
        input.customers.iter().map(|customer| (&customer.id, customer.tier)).collect();

    DashboardSnapshot {
        manager_id: input.manager_id.clone(),
        range: input.range,
        total_calls: in_range.len(),
        today_calls,
        month_calls,
        pending_approvals: input.pending_approvals,
        abc_coverage: abc_coverage(&tiers, &in_range),
        team_performance: input
            .subordinates
            .iter()
            .map(|member| member_performance(member, &tiers, &in_range))
            .collect(),
    }
}

fn abc_coverage(tiers: &HashMap<&CustomerId, Tier>, reports: &[&CallReport]) -> AbcCoverage {
    let visited: HashSet<&CustomerId> = reports
        .iter()
        .map(|report| &report.customer_id)
        .filter(|customer_id| tiers.contains_key(customer_id))
        .collect();

    let mut totals: BTreeMap<Tier, (usize, usize)> =
        Tier::ALL.iter().map(|tier| (*tier, (0, 0))).collect();
    for (customer_id, tier) in tiers {
        let entry = totals.entry(*tier).or_insert((0, 0));
        entry.0 += 1;
        if visited.contains(customer_id) {
            entry.1 += 1;
        }
    }

    AbcCoverage {
        total: tiers.len(),
        visited: visited.len(),
        percentage: percentage(visited.len(), tiers.len()),
        by_tier: totals
            .into_iter()
            .map(|(tier, (total, visited))| TierCoverage {
                tier,
                total,
                visited,
                percentage: percentage(visited, total),
            })
            .collect(),
    }
}

fn member_performance(
    member: &User,
    tiers: &HashMap<&CustomerId, Tier>,
    reports: &[&CallReport],
) -> MemberPerformance {
    let own: Vec<&CallReport> =
        reports.iter().copied().filter(|report| report.sr_id == member.id).collect();
    let planned_calls = own.iter().filter(|report| report.is_planned).count();

    let abc_customers_visited = own
        .iter()
        .map(|report| &report.customer_id)
        .filter(|customer_id| tiers.contains_key(customer_id))
        .collect::<HashSet<_>>()
        .len();

    let durations: Vec<i64> = own.iter().filter_map(|report| report.duration_minutes()).collect();
    let average_duration_minutes = if durations.is_empty() {
        0.0
    } else {
        round2(durations.iter().sum::<i64>() as f64 / durations.len() as f64)
    };

    MemberPerformance {
        user_id: member.id.clone(),
        full_name: member.full_name.clone(),
        total_calls: own.len(),
        planned_calls,
        unplanned_calls: own.len() - planned_calls,
        planned_ratio: percentage(planned_calls, own.len()),
        abc_customers_visited,
        average_duration_minutes,
    }
}
