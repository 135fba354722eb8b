use serde_json::json;

use crate::commands::{prepare, CommandResult};
use callplan_db::{connect_with_config, migrations, DemoSeedDataset, SeedResult};

/// Loads the demo organisation: CEO, director, manager, two representatives, and customers in
/// every tier. Re-running updates the same rows.
pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success_with(
            "seed",
            summary(&seeded),
            Some(json!({
                "users": seeded.users,
                "customers": seeded.customers,
                "contacts": seeded.contacts,
                "plans": seeded.plans,
            })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo dataset upserted: {} users, {} customers, {} contacts, {} new plans",
        seeded.users, seeded.customers, seeded.contacts, seeded.plans
    )
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use callplan_db::SeedResult;

    use super::{summary, verification_message};

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [("users", true), ("pending-plan", false), ("primary-contact", false)];

        assert_eq!(
            verification_message(&checks),
            "Seed verification failed for checks: pending-plan, primary-contact"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        assert_eq!(verification_message(&[("users", true)]), "Some seed data failed to load");
    }

    #[test]
    fn rerun_summary_reports_no_new_plans() {
        let seeded = SeedResult { users: 5, customers: 4, contacts: 1, plans: 0 };
        assert_eq!(
            summary(&seeded),
            "demo dataset upserted: 5 users, 4 customers, 1 contacts, 0 new plans"
        );
    }
}
