use gridrush_game::data::RawJob;
use gridrush_game::{Coord, Job, JobScheduler};
use serde_json::json;

fn job(id: &str, priority: i32, release_time: f64) -> Job {
    let mut job = Job::new(id, Coord::new(0, 0), Coord::new(5, 5));
    job.priority = priority;
    job.release_time = release_time;
    job.payout = 10.0;
    job
}

#[test]
fn offers_follow_priority_then_release_then_insertion() {
    let mut sched = JobScheduler::new();
    sched.upsert(job("low", 1, 0.0));
    sched.upsert(job("late-release", 5, 20.0));
    sched.upsert(job("early-release", 5, 5.0));
    sched.upsert(job("tie-first", 3, 10.0));
    sched.upsert(job("tie-second", 3, 10.0));

    let order: Vec<&str> = sched
        .eligible_jobs(100.0)
        .iter()
        .map(|j| j.id.as_str())
        .collect();
    assert_eq!(
        order,
        ["early-release", "late-release", "tie-first", "tie-second", "low"]
    );
}

#[test]
fn release_time_gates_eligibility() {
    let mut sched = JobScheduler::new();
    sched.upsert(job("future", 9, 100.0));
    sched.upsert(job("now", 1, 0.0));

    assert_eq!(sched.peek_next_offer(50.0).unwrap().id, "now");
    assert_eq!(sched.peek_next_offer(100.0).unwrap().id, "future");
}

#[test]
fn peek_is_non_destructive() {
    let mut sched = JobScheduler::new();
    sched.upsert(job("a", 2, 0.0));
    sched.upsert(job("b", 1, 0.0));

    for _ in 0..3 {
        assert_eq!(sched.peek_next_offer(10.0).unwrap().id, "a");
    }
    assert_eq!(sched.eligible_jobs(10.0).len(), 2);
}

#[test]
fn accept_removes_from_offer_flow_and_is_idempotent() {
    let mut sched = JobScheduler::new();
    sched.upsert(job("a", 2, 0.0));
    sched.upsert(job("b", 1, 0.0));

    assert!(sched.accept("a"));
    assert!(sched.accept("a"), "accepting twice is a no-op success");
    assert_eq!(sched.peek_next_offer(10.0).unwrap().id, "b");
    assert_eq!(sched.active_jobs().len(), 1);
}

#[test]
fn rejected_jobs_never_come_back() {
    let mut sched = JobScheduler::new();
    sched.upsert(job("a", 2, 0.0));
    assert!(sched.reject("a"));
    assert!(sched.peek_next_offer(10.0).is_none());

    // A later feed refresh for the same id cannot resurrect it.
    sched.upsert(job("a", 9, 0.0));
    assert!(sched.peek_next_offer(10.0).is_none());
    assert!(sched.get("a").unwrap().rejected);
}

#[test]
fn upsert_reindexes_on_priority_change() {
    let mut sched = JobScheduler::new();
    sched.upsert(job("a", 1, 0.0));
    sched.upsert(job("b", 2, 0.0));
    assert_eq!(sched.peek_next_offer(10.0).unwrap().id, "b");

    sched.upsert(job("a", 7, 0.0));
    assert_eq!(sched.peek_next_offer(10.0).unwrap().id, "a");
}

#[test]
fn add_raw_normalizes_messy_fields() {
    let raw: RawJob = serde_json::from_value(json!({
        "id": "  messy-1  ",
        "pickup": "2, 3",
        "dropoff": {"col": 8, "row": 9},
        "payout": "42.5",
        "priority": "4",
        "weight": -1.0,
        "deadline": "300"
    }))
    .unwrap();

    let mut sched = JobScheduler::new();
    let added = sched.add_raw(&raw, None).unwrap();
    assert_eq!(added.id, "messy-1");
    assert_eq!(added.pickup, Coord::new(2, 3));
    assert_eq!(added.dropoff, Coord::new(8, 9));
    assert!((added.payout - 42.5).abs() < f64::EPSILON);
    assert_eq!(added.priority, 4);
    assert!(added.weight.abs() < f64::EPSILON, "negative weight clamps to zero");
    assert_eq!(added.deadline, Some(300.0));
}

#[test]
fn add_raw_without_id_is_dropped() {
    let raw: RawJob = serde_json::from_value(json!({"pickup": [1, 1]})).unwrap();
    let mut sched = JobScheduler::new();
    assert!(sched.add_raw(&raw, None).is_none());
    assert!(sched.is_empty());
}
