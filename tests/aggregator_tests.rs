use tokio::time::{Duration, Instant};
use uuid::Uuid;

use breathwork::config::SessionConfig;
use breathwork::kernel::aggregator::SessionAggregator;
use breathwork::kernel::phase::StoppedSession;
use breathwork::kernel::technique::Catalog;

fn stopped(secs: f64) -> StoppedSession {
    StoppedSession {
        cycles_completed: 3,
        elapsed_seconds: secs,
    }
}

#[test]
fn test_threshold_is_exclusive() {
    let technique = Catalog::builtin().get("box").unwrap();
    let mut agg = SessionAggregator::new(&SessionConfig::default());
    let now = Instant::now();

    assert!(agg.record(Uuid::new_v4(), &technique, stopped(10.0), now).is_none());
    assert_eq!(agg.lifetime_sessions(), 0);

    let outcome = agg.record(Uuid::new_v4(), &technique, stopped(10.5), now).unwrap();
    assert_eq!(outcome.summary.lifetime_session_count, 1);
    assert_eq!(outcome.summary.technique_name, "Box Breathing");
    assert!(outcome.milestone.is_none());
}

#[test]
fn test_milestone_every_fifth_session() {
    let technique = Catalog::builtin().get("478").unwrap();
    let mut agg = SessionAggregator::new(&SessionConfig::default());
    let now = Instant::now();

    // 1. Sessions 1..=10; milestones at 5 and 10.
    let mut milestones = Vec::new();
    for _ in 0..10 {
        let outcome = agg.record(Uuid::new_v4(), &technique, stopped(60.0), now).unwrap();
        if let Some(m) = outcome.milestone {
            milestones.push(m.session_count);
        }
    }
    assert_eq!(milestones, vec![5, 10]);

    // 2. Displayed for 3.5 s.
    assert!(!agg.expire_milestone(now + Duration::from_secs(3)));
    assert!(agg.expire_milestone(now + Duration::from_millis(3_500)));
    assert!(agg.milestone().is_none());
    assert!(!agg.expire_milestone(now + Duration::from_secs(10)));
}

#[test]
fn test_formatted_elapsed() {
    let technique = Catalog::builtin().get("power").unwrap();
    let mut agg = SessionAggregator::new(&SessionConfig::default());
    let outcome = agg.record(Uuid::new_v4(), &technique, stopped(125.7), Instant::now()).unwrap();
    assert_eq!(outcome.summary.formatted_elapsed(), "2:05");
}

#[test]
fn test_unusable_display_time_uses_default() {
    let technique = Catalog::builtin().get("box").unwrap();
    let config = SessionConfig {
        milestone_every: 1,
        milestone_display_secs: 1e20,
        ..SessionConfig::default()
    };
    let mut agg = SessionAggregator::new(&config);
    let now = Instant::now();

    let m = agg.record(Uuid::new_v4(), &technique, stopped(30.0), now).unwrap().milestone.unwrap();
    assert_eq!(m.dismiss_at, now + Duration::from_millis(3_500));
}
