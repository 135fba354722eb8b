use std::sync::Arc;

use chrono::NaiveDate;

use callplan_core::audit::InMemoryAuditSink;
use callplan_core::config::WorkflowConfig;
use callplan_core::domain::customer::{ContactId, CustomerId, GeoPoint};
use callplan_core::domain::plan::{NewPlan, PlanId, PlanStatus};
use callplan_core::domain::report::{CallActivityType, CheckIn, ReportStatus};
use callplan_core::domain::user::UserId;
use callplan_core::errors::ErrorKind;
use callplan_core::notifications::{InMemoryNotificationSink, NotificationKind};
use callplan_db::{connect_with_settings, migrations, DemoSeedDataset};
use callplan_workflow::{Caller, Decision, WorkflowContext, WorkflowServices};

struct Harness {
    services: WorkflowServices,
    audit: InMemoryAuditSink,
    notifications: InMemoryNotificationSink,
}

async fn harness() -> Harness {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    DemoSeedDataset::load(&pool).await.expect("seed");

    let audit = InMemoryAuditSink::default();
    let notifications = InMemoryNotificationSink::default();
    let context = WorkflowContext::sql(
        pool,
        Arc::new(audit.clone()),
        Arc::new(notifications.clone()),
        WorkflowConfig::default(),
    );
    Harness { services: WorkflowServices::new(context), audit, notifications }
}

fn caller(id: &str) -> Caller {
    Caller::with_correlation_id(UserId(id.to_string()), format!("it-{id}"))
}

#[tokio::test]
async fn planned_visit_round_trip_against_sqlite() {
    let harness = harness().await;
    let services = &harness.services;
    let rep = caller("usr-rep-andi");
    let manager = caller("usr-manager");

    let plan = services
        .plans
        .create(
            &rep,
            NewPlan {
                customer_id: CustomerId("cust-rs-medika".to_string()),
                contact_id: Some(ContactId("contact-rs-medika-pharmacist".to_string())),
                plan_date: NaiveDate::from_ymd_opt(2025, 1, 10).expect("date"),
                objectives: Some("Follow up on the formulary listing".to_string()),
                planned_activities: vec!["detailing".to_string()],
            },
        )
        .await
        .expect("create");
    services.plans.submit(&rep, &plan.id).await.expect("submit");

    let queue = services.plans.pending_approvals(&manager).await.expect("queue");
    assert!(queue.iter().any(|pending| pending.id == plan.id));

    let approved = services.approvals.decide(&manager, &plan.id, Decision::approve()).await.expect("approve");
    assert_eq!(approved.status, PlanStatus::Approved);

    let report = services
        .reports
        .check_in(
            &rep,
            CheckIn {
                customer_id: CustomerId("cust-rs-medika".to_string()),
                contact_id: None,
                pre_call_plan_id: Some(plan.id.clone()),
                location: GeoPoint { lat: -6.2, lng: 106.82 },
                call_activity_type: CallActivityType::FaceToFace,
                activities_done: vec!["detailing".to_string()],
                is_planned: false,
            },
        )
        .await
        .expect("check in");
    assert_eq!(report.contact_id, plan.contact_id);

    let submitted = services.reports.submit(&rep, &report.id).await.expect("submit report");
    assert_eq!(submitted.status, ReportStatus::Submitted);
    assert!(submitted.is_planned);

    let stored_plan = services.plans.get(&manager, &plan.id).await.expect("plan");
    assert_eq!(stored_plan.status, PlanStatus::Approved);
    assert_eq!(stored_plan.approved_by, Some(UserId("usr-manager".to_string())));

    let kinds: Vec<_> = harness.notifications.events().iter().map(|event| event.kind).collect();
    assert_eq!(kinds, vec![NotificationKind::PlanSubmitted, NotificationKind::PlanApproved]);

    let dashboard = services.dashboard.snapshot(&manager, None).await.expect("dashboard");
    assert_eq!(dashboard.total_calls, 1);
    assert_eq!(dashboard.pending_approvals, 1, "the seeded plan is still waiting");
}

#[tokio::test]
async fn concurrent_decisions_on_the_seeded_plan_have_one_winner() {
    let harness = harness().await;
    let approvals = &harness.services.approvals;
    let manager = caller("usr-manager");
    let plan_id = PlanId("plan-demo-pending".to_string());

    let (first, second) = tokio::join!(
        approvals.decide(&manager, &plan_id, Decision::approve()),
        approvals.decide(&manager, &plan_id, Decision::reject("visit already covered")),
    );

    let outcomes = [first.is_ok(), second.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let loser = first.err().or(second.err()).expect("one loser");
    assert_eq!(loser.kind(), ErrorKind::InvalidState);

    let decisions = harness.audit.events_of_type("approval.plan_approved").len()
        + harness.audit.events_of_type("approval.plan_rejected").len();
    assert_eq!(decisions, 2, "both attempts are audited");
}

fn draft_plan() -> NewPlan {
    NewPlan {
        customer_id: CustomerId("cust-apotek-sehat".to_string()),
        contact_id: None,
        plan_date: NaiveDate::from_ymd_opt(2025, 2, 3).expect("date"),
        objectives: None,
        planned_activities: Vec::new(),
    }
}

fn walk_in(customer: &str) -> CheckIn {
    CheckIn {
        customer_id: CustomerId(customer.to_string()),
        contact_id: None,
        pre_call_plan_id: None,
        location: GeoPoint { lat: -6.19, lng: 106.83 },
        call_activity_type: CallActivityType::Virtual,
        activities_done: Vec::new(),
        is_planned: false,
    }
}

#[tokio::test]
async fn concurrent_plan_submissions_have_one_winner() {
    let harness = harness().await;
    let plans = &harness.services.plans;
    let rep = caller("usr-rep-andi");
    let plan = plans.create(&rep, draft_plan()).await.expect("create");

    let (first, second) = tokio::join!(plans.submit(&rep, &plan.id), plans.submit(&rep, &plan.id));

    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = first.err().or(second.err()).expect("one loser");
    assert_eq!(loser.kind(), ErrorKind::InvalidState);

    let stored = plans.get(&rep, &plan.id).await.expect("plan");
    assert_eq!(stored.status, PlanStatus::Pending);
    let submitted = harness
        .notifications
        .events()
        .iter()
        .filter(|event| event.kind == NotificationKind::PlanSubmitted)
        .count();
    assert_eq!(submitted, 1);
}

#[tokio::test]
async fn concurrent_report_submissions_have_one_winner() {
    let harness = harness().await;
    let reports = &harness.services.reports;
    let rep = caller("usr-rep-andi");
    let report = reports.check_in(&rep, walk_in("cust-apotek-sehat")).await.expect("check in");

    let (first, second) =
        tokio::join!(reports.submit(&rep, &report.id), reports.submit(&rep, &report.id));

    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = first.err().or(second.err()).expect("one loser");
    assert_eq!(loser.kind(), ErrorKind::InvalidState);

    let stored = reports.get(&rep, &report.id).await.expect("report");
    assert_eq!(stored.status, ReportStatus::Submitted);
    assert_eq!(harness.audit.events_of_type("report.submitted").len(), 2);
}

#[tokio::test]
async fn draft_plans_behind_a_report_cannot_be_deleted() {
    let harness = harness().await;
    let services = &harness.services;
    let rep = caller("usr-rep-andi");
    let plan = services.plans.create(&rep, draft_plan()).await.expect("create");
    let mut check_in = walk_in("cust-apotek-sehat");
    check_in.pre_call_plan_id = Some(plan.id.clone());
    let report = services.reports.check_in(&rep, check_in).await.expect("check in");

    let error = services.plans.delete(&rep, &plan.id).await.expect_err("anchored");
    assert_eq!(error.kind(), ErrorKind::Conflict);

    let linked = services.reports.get(&rep, &report.id).await.expect("report");
    assert_eq!(linked.pre_call_plan_id, Some(plan.id.clone()));
    services.plans.get(&rep, &plan.id).await.expect("plan still there");
}

#[tokio::test]
async fn skip_level_director_cannot_decide() {
    let harness = harness().await;
    let plan_id = PlanId("plan-demo-pending".to_string());

    let error = harness
        .services
        .approvals
        .decide(&caller("usr-director"), &plan_id, Decision::approve())
        .await
        .expect_err("skip level");
    assert_eq!(error.kind(), ErrorKind::Forbidden);

    let plan = harness.services.plans.get(&caller("usr-rep-andi"), &plan_id).await.expect("plan");
    assert_eq!(plan.status, PlanStatus::Pending);
}
