use std::hash::Hasher;

use gridrush_game::{Coord, GameManager, Job, JobScheduler, TickInput, WorldData};
use twox_hash::XxHash64;

fn digest(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

const FEED: &str = r#"{
    "map": {"start_time": "2026-05-01T08:00:00Z", "max_time": 600.0, "goal": 150.0},
    "jobs": [
        {"id": "arr", "pickup": [2, 4], "dropoff": [6, 1], "payout": 40,
         "deadline": "2026-05-01T08:10:00Z"},
        {"id": "obj", "pickup": {"col": 7, "row": 3}, "dropoff": {"cx": 1, "cy": 9},
         "payout": "55.5", "priority": "2", "deadline": "240"},
        {"pickup": [9, 9], "payout": 999},
        {"id": "str", "pickup": " 5 , 5 ", "dropoff": "5;0", "weight": 4}
    ],
    "weather": {"transitions": {"clear": {"clouds": 1.0}, "plasma": {"clear": 1.0}}}
}"#;

#[test]
fn world_feed_normalizes_heterogeneous_shapes() {
    let world = WorldData::from_json(FEED);
    let map_start = world.map.parsed_start();
    assert!(map_start.is_some());

    let mut sched = JobScheduler::new();
    for raw in &world.jobs {
        sched.add_raw(raw, map_start);
    }
    // The id-less record is dropped, everything else degrades gracefully.
    assert_eq!(sched.len(), 3);

    let arr = sched.get("arr").unwrap();
    assert_eq!(arr.pickup, Coord::new(2, 4));
    assert_eq!(
        arr.deadline,
        Some(600.0),
        "ISO deadlines anchor to the map start"
    );

    let obj = sched.get("obj").unwrap();
    assert_eq!(obj.pickup, Coord::new(7, 3));
    assert_eq!(obj.dropoff, Coord::new(1, 9));
    assert!((obj.payout - 55.5).abs() < f64::EPSILON);
    assert_eq!(obj.priority, 2);
    assert_eq!(obj.deadline, Some(240.0), "numeric strings are bare offsets");

    let s = sched.get("str").unwrap();
    assert_eq!(s.pickup, Coord::new(5, 5));
    assert_eq!(s.dropoff, Coord::new(5, 0));
    assert_eq!(s.deadline, None);
}

#[test]
fn normalized_job_digest_survives_a_serde_roundtrip() {
    let world = WorldData::from_json(FEED);
    let map_start = world.map.parsed_start();
    let jobs: Vec<Job> = world
        .jobs
        .iter()
        .filter_map(|raw| raw.normalize(map_start))
        .collect();

    let canonical = serde_json::to_string_pretty(&jobs).unwrap();
    let first = digest(canonical.as_bytes());

    let reparsed: Vec<Job> = serde_json::from_str(&canonical).unwrap();
    let second = digest(serde_json::to_string_pretty(&reparsed).unwrap().as_bytes());
    assert_eq!(first, second, "normalization must be a serde fixed point");

    let mut altered = reparsed;
    altered[0].payout += 1.0;
    let third = digest(serde_json::to_string_pretty(&altered).unwrap().as_bytes());
    assert_ne!(first, third);
}

#[test]
fn malformed_world_json_degrades_to_an_empty_session() {
    let world = WorldData::from_json("{not json at all");
    assert!(world.jobs.is_empty());

    let mut gm = GameManager::from_world(&world, 5);
    assert!(gm.goal().abs() < f64::EPSILON);
    assert!(gm.scheduler().is_empty());
    // An empty session still ticks without surfacing anything.
    let out = gm.tick(1.0, TickInput::default());
    assert!(out.tags.is_empty());
}

#[test]
fn session_snapshot_round_trips_through_serde() {
    let world = WorldData::from_json(FEED);
    let mut gm = GameManager::from_world(&world, 11);
    gm.tick(
        12.0,
        TickInput {
            cells_completed: 3,
            move_to: Some(Coord::new(3, 0)),
            input_active: true,
        },
    );

    let snapshot = gm.snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored = serde_json::from_str(&json).unwrap();

    let mut replica = GameManager::from_world(&world, 11);
    replica.restore(restored);
    assert_eq!(replica.position(), gm.position());
    assert!((replica.clock().now() - gm.clock().now()).abs() < 1.0e-9);
    assert!((replica.stats().stamina() - gm.stats().stamina()).abs() < 1.0e-9);
    assert_eq!(replica.weather_report(), gm.weather_report());
}

#[test]
fn unknown_weather_conditions_never_reach_the_matrix() {
    let world = WorldData::from_json(FEED);
    let cfg = gridrush_game::WeatherConfig::from_data(&world.weather);
    assert_eq!(cfg.transitions.len(), 1, "the plasma row is dropped");
}
