//! Concurrency tests for the single-writer ladder
//!
//! Many tasks hammer the same ladder; every result must be applied exactly
//! once and readers must never see a half-applied match.

mod fixtures;

use fixtures::{memory_ladder, team_names};
use futures::future::join_all;
use ladder_room::error::{error_kind, ErrorKind};
use ladder_room::types::{MatchType, Rating};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_submissions_for_one_match() {
    let ladder = Arc::new(memory_ladder());
    let scheduled = ladder
        .schedule_match("Alpha", "Bravo", 1, MatchType::Regular)
        .unwrap();

    let attempts = (0..16).map(|i| {
        let ladder = ladder.clone();
        let id = scheduled.id;
        tokio::spawn(async move {
            // Alternate winners so a double application would show in ratings
            if i % 2 == 0 {
                ladder.submit_result(id, 3, 0, 75, 50)
            } else {
                ladder.submit_result(id, 0, 3, 50, 75)
            }
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(error_kind(err), ErrorKind::InvalidState);
    }

    let alpha = ladder.get_team("Alpha").unwrap();
    let bravo = ladder.get_team("Bravo").unwrap();
    assert_eq!(alpha.matches_played, 1);
    assert_eq!(bravo.matches_played, 1);
    assert_eq!(alpha.history.len(), 1);
    assert!(alpha.rating == 1028 || bravo.rating == 1028);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_results_across_matches() {
    let ladder = Arc::new(memory_ladder());
    let names = team_names(40);
    let scheduled: Vec<_> = names
        .chunks_exact(2)
        .map(|pair| {
            ladder
                .schedule_match(&pair[0], &pair[1], 1, MatchType::Regular)
                .unwrap()
        })
        .collect();

    let start = Instant::now();
    let writers = scheduled.iter().map(|m| {
        let ladder = ladder.clone();
        let id = m.id;
        tokio::spawn(async move { ladder.submit_result(id, 3, 2, 70, 68) })
    });

    // Readers run alongside the writers and must always see whole results
    let readers = (0..8).map(|_| {
        let ladder = ladder.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                let snapshot = ladder.snapshot().unwrap();
                let completed = snapshot.matches.iter().filter(|m| m.completed).count();
                let played: u32 = snapshot.teams.iter().map(|t| t.matches_played).sum();
                assert_eq!(played as usize, completed * 2);
                let total: Rating = snapshot.teams.iter().map(|t| t.rating).sum();
                assert!(total >= 1000 * snapshot.teams.len() as Rating);
                tokio::task::yield_now().await;
            }
        })
    });

    let (written, read) = futures::join!(join_all(writers), join_all(readers));
    for joined in written {
        joined.unwrap().unwrap();
    }
    for joined in read {
        joined.unwrap();
    }

    assert!(start.elapsed() < Duration::from_secs(5));
    let stats = ladder.stats().unwrap();
    assert_eq!(stats.completed_matches, 20);
    assert_eq!(stats.scheduled_matches, 0);
}
