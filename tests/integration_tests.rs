//! Integration tests for the ladder-room service
//!
//! These tests drive the ladder through its public API:
//! - Full weekly cycles of pairing, results and standings
//! - Atomicity of result submission
//! - Inactivity sweeps across weeks
//! - JSON and SQLite persistence across restarts
//! - Backup and restore

mod fixtures;

use fixtures::{
    json_ladder, ladder_on, memory_ladder, play, sqlite_ladder, team_names, FlakyStorage,
};
use ladder_room::config::LadderConfig;
use ladder_room::error::{error_kind, ErrorKind};
use ladder_room::types::{MatchType, Outcome, TeamProfile};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn test_weekly_cycle() {
    let ladder = memory_ladder();
    for name in team_names(8) {
        ladder.register_team(&name).unwrap();
    }

    let mut rng = StdRng::seed_from_u64(7);
    let week = ladder.current_week().unwrap();
    let matches = ladder.generate_matches_with_rng(1, week, &mut rng).unwrap();
    assert_eq!(matches.len(), 4);

    // With one match per team nobody appears twice
    let mut seen = HashSet::new();
    for m in &matches {
        assert!(seen.insert(m.team_a.clone()));
        assert!(seen.insert(m.team_b.clone()));
    }

    for m in &matches {
        ladder.submit_result(m.id, 3, 1, 70, 58).unwrap();
    }

    let standings = ladder.standings().unwrap();
    assert_eq!(standings.len(), 8);
    for pair in standings.windows(2) {
        assert!(
            pair[0].rating > pair[1].rating
                || (pair[0].rating == pair[1].rating && pair[0].name < pair[1].name)
        );
    }

    let winners: HashSet<_> = matches.iter().map(|m| m.team_a.clone()).collect();
    for team in &standings[..4] {
        assert!(winners.contains(&team.name), "{} should lead", team.name);
        assert_eq!(team.wins, 1);
    }

    assert_eq!(ladder.advance_week().unwrap(), 2);
    let stats = ladder.stats().unwrap();
    assert_eq!(stats.completed_matches, 4);
    assert_eq!(stats.scheduled_matches, 0);
}

#[test]
fn test_double_submission_is_rejected_without_changes() {
    let ladder = memory_ladder();
    let result = play(&ladder, "Alpha", "Bravo", (3, 2), (72, 70));
    let before = ladder.snapshot().unwrap();

    let err = ladder
        .submit_result(result.match_record.id, 0, 3, 40, 75)
        .unwrap_err();
    assert_eq!(error_kind(&err), ErrorKind::InvalidState);
    assert_eq!(ladder.snapshot().unwrap(), before);
}

#[test]
fn test_placement_then_established_k() {
    let ladder = memory_ladder();

    // Alpha and Bravo play out their three placement matches against fresh teams
    for i in 0..3 {
        play(&ladder, "Alpha", &format!("Rookie A{}", i), (3, 0), (75, 50));
        play(&ladder, "Bravo", &format!("Rookie B{}", i), (3, 0), (75, 50));
    }
    let alpha = ladder.get_team("Alpha").unwrap();
    let bravo = ladder.get_team("Bravo").unwrap();
    assert_eq!(alpha.rating, bravo.rating);
    assert!(!alpha.is_in_placement(3));

    // Equal established teams: the 3-0 winner gains 10 + 5 + 2.5 rounded
    let result = play(&ladder, "Alpha", "Bravo", (3, 0), (75, 50));
    assert_eq!(result.team_a.rating - alpha.rating, 18);
    assert_eq!(result.team_b.rating - bravo.rating, -10);
}

#[test]
fn test_challenge_match_halves_the_swing() {
    let ladder = memory_ladder();
    let scheduled = ladder
        .schedule_match("Alpha", "Bravo", 1, MatchType::Challenge)
        .unwrap();
    let result = ladder.submit_result(scheduled.id, 3, 0, 75, 50).unwrap();

    // Placement K of 40 on both sides, then halved
    assert_eq!(result.team_a.rating, 1000 + 14);
    assert_eq!(result.team_b.rating, 1000 - 10);
}

#[test]
fn test_failed_write_leaves_ladder_unchanged() {
    let storage = Arc::new(FlakyStorage::new());
    let ladder = ladder_on(storage.clone(), LadderConfig::default());
    let scheduled = ladder
        .schedule_match("Alpha", "Bravo", 1, MatchType::Regular)
        .unwrap();
    let before = ladder.snapshot().unwrap();
    let saves = storage.save_count();

    storage.fail_saves(true);
    let err = ladder
        .submit_result(scheduled.id, 3, 0, 75, 50)
        .unwrap_err();
    assert_eq!(error_kind(&err), ErrorKind::Storage);
    assert_eq!(ladder.snapshot().unwrap(), before);
    assert_eq!(storage.save_count(), saves);

    // The same submission goes through once storage recovers
    storage.fail_saves(false);
    let result = ladder.submit_result(scheduled.id, 3, 0, 75, 50).unwrap();
    assert!(result.match_record.completed);
}

#[test]
fn test_inactivity_over_several_weeks() {
    let ladder = memory_ladder();
    play(&ladder, "Alpha", "Bravo", (3, 1), (70, 60));
    let bravo_after_match = ladder.get_team("Bravo").unwrap().rating;

    ladder.set_week(2).unwrap();
    play(&ladder, "Alpha", "Charlie", (3, 0), (75, 40));

    // Bravo idles from week 1, Alpha and Charlie from week 2
    ladder.set_week(5).unwrap();
    let reports = ladder.apply_inactivity_sweep(5).unwrap();
    let bravo = reports.iter().find(|r| r.team == "Bravo").unwrap();
    assert_eq!(bravo.weeks_charged, 4);
    assert_eq!(bravo.rating_after, bravo_after_match - 40);
    assert!(bravo.deactivated);

    let alpha = reports.iter().find(|r| r.team == "Alpha").unwrap();
    assert_eq!(alpha.weeks_charged, 3);
    assert!(!alpha.deactivated);

    // Inactive teams are left out of pairing
    let generated = ladder.generate_matches(1, 5).unwrap();
    assert_eq!(generated.len(), 1);
    assert!(!generated[0].involves("Bravo"));

    let history = ladder.team_history("Bravo").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].outcome, Outcome::InactivityPenalty);
    assert_eq!(history[1].week, 5);
}

#[test]
fn test_reactivated_team_starts_a_fresh_window() {
    let ladder = memory_ladder();
    ladder.register_team("Alpha").unwrap();
    ladder.set_week(6).unwrap();
    ladder.apply_inactivity_sweep(6).unwrap();
    assert!(!ladder.get_team("Alpha").unwrap().active);

    let team = ladder.reactivate_team("Alpha").unwrap();
    assert!(team.active);
    assert_eq!(team.reactivated_week, Some(6));

    ladder.set_week(7).unwrap();
    let reports = ladder.apply_inactivity_sweep(7).unwrap();
    assert_eq!(reports[0].weeks_charged, 1);
    assert!(!reports[0].deactivated);
}

#[test]
fn test_json_persistence_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("ladder.json");

    let (match_id, snapshot) = {
        let ladder = json_ladder(&path);
        let result = play(&ladder, "Alpha", "Bravo", (3, 0), (75, 50));
        ladder
            .schedule_match("Alpha", "Charlie", 1, MatchType::Challenge)
            .unwrap();
        ladder.advance_week().unwrap();
        (result.match_record.id, ladder.snapshot().unwrap())
    };
    assert!(path.exists());

    let reopened = json_ladder(&path);
    assert_eq!(reopened.snapshot().unwrap(), snapshot);
    assert_eq!(reopened.current_week().unwrap(), 2);
    assert!(reopened.get_match(match_id).unwrap().completed);
    assert_eq!(reopened.get_team("Alpha").unwrap().rating, 1028);
    assert_eq!(reopened.list_matches(Some(1)).unwrap().len(), 2);
}

#[test]
fn test_corrupt_data_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ladder.json");
    std::fs::write(&path, "{ not json").unwrap();

    let storage = Arc::new(ladder_room::ladder::JsonFileStorage::new(&path));
    let calculator = Arc::new(ladder_room::rating::EloMmrCalculator::default());
    let err = ladder_room::ladder::LadderManager::new(storage, calculator, LadderConfig::default())
        .err()
        .unwrap();
    assert_eq!(error_kind(&err), ErrorKind::Storage);
}

#[test]
fn test_sqlite_persistence_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ladder.db");

    let snapshot = {
        let ladder = sqlite_ladder(&path);
        ladder
            .register_team_with(
                "Alpha",
                TeamProfile {
                    roster: Some(vec!["Ana".to_string()]),
                    ..TeamProfile::default()
                },
            )
            .unwrap();
        play(&ladder, "Alpha", "Bravo", (3, 2), (72, 70));
        ladder
            .schedule_match("Bravo", "Charlie", 1, MatchType::Challenge)
            .unwrap();
        ladder.advance_week().unwrap();
        ladder.snapshot().unwrap()
    };

    let reopened = sqlite_ladder(&path);
    assert_eq!(reopened.snapshot().unwrap(), snapshot);
    assert_eq!(reopened.current_week().unwrap(), 2);
    assert_eq!(reopened.get_team("Alpha").unwrap().roster, vec!["Ana"]);
    assert_eq!(reopened.team_history("Bravo").unwrap().len(), 1);
}

#[test]
fn test_generation_after_manual_scheduling() {
    let ladder = memory_ladder();
    let names = team_names(6);
    for name in &names {
        ladder.register_team(name).unwrap();
    }
    ladder
        .schedule_match(&names[0], &names[1], 1, MatchType::Challenge)
        .unwrap();

    let mut rng = StdRng::seed_from_u64(21);
    let generated = ladder.generate_matches_with_rng(1, 1, &mut rng).unwrap();
    assert_eq!(generated.len(), 2);

    let mut seen = HashSet::new();
    for m in ladder.list_matches(Some(1)).unwrap() {
        assert!(seen.insert(m.team_a.clone()), "{} plays twice", m.team_a);
        assert!(seen.insert(m.team_b.clone()), "{} plays twice", m.team_b);
    }
    assert_eq!(seen.len(), 6);
}

#[test]
fn test_restore_from_backup_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ladder.json");
    let backups = dir.path().join("backups");

    let ladder = json_ladder(&path);
    play(&ladder, "Alpha", "Bravo", (3, 0), (75, 50));
    let backed_up = ladder.snapshot().unwrap();
    ladder.backup(&backups).unwrap();

    play(&ladder, "Alpha", "Charlie", (0, 3), (40, 75));
    assert_ne!(ladder.snapshot().unwrap(), backed_up);

    ladder.restore(&backups, None).unwrap();
    drop(ladder);

    let reopened = json_ladder(&path);
    assert_eq!(reopened.snapshot().unwrap(), backed_up);
}
