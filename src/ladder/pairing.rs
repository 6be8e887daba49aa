//! Random weekly pairing
//!
//! Shuffle-and-pair until every team has its quota of matches for the week.
//! Matches already in the week count against the quota and their pairings are
//! never repeated, and a team only plays more than once when its quota is
//! above one.

use crate::types::TeamName;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Shuffles that may produce no new pairing before generation gives up
const MAX_STALLED_ROUNDS: usize = 8;

fn pair_key<'a>(a: &'a TeamName, b: &'a TeamName) -> (&'a TeamName, &'a TeamName) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Pair `teams` so each plays up to `matches_per_team` times in the week.
///
/// `scheduled` holds the pairings the week already has. They count toward
/// each team's quota and are not paired again. Teams left without a partner
/// (odd pool, or only repeat pairings remain) simply receive fewer matches.
pub fn pair_teams<R: Rng + ?Sized>(
    teams: &[TeamName],
    matches_per_team: u32,
    scheduled: &[(TeamName, TeamName)],
    rng: &mut R,
) -> Vec<(TeamName, TeamName)> {
    let mut pool: Vec<&TeamName> = teams.iter().collect();
    pool.sort();
    pool.dedup();

    let mut counts: HashMap<&TeamName, u32> = pool.iter().map(|team| (*team, 0)).collect();
    let mut used: HashSet<(&TeamName, &TeamName)> = HashSet::new();
    for (a, b) in scheduled {
        for team in [a, b] {
            if let Some(count) = counts.get_mut(team) {
                *count += 1;
            }
        }
        used.insert(pair_key(a, b));
    }
    let mut pairs = Vec::new();
    let mut stalled = 0;

    while stalled < MAX_STALLED_ROUNDS {
        let mut open: Vec<&TeamName> = pool
            .iter()
            .copied()
            .filter(|team| counts[team] < matches_per_team)
            .collect();
        if open.len() < 2 {
            break;
        }
        open.shuffle(rng);

        let mut added = 0;
        for chunk in open.chunks_exact(2) {
            let (a, b) = (chunk[0], chunk[1]);
            if !used.insert(pair_key(a, b)) {
                continue;
            }
            *counts.entry(a).or_default() += 1;
            *counts.entry(b).or_default() += 1;
            pairs.push((a.clone(), b.clone()));
            added += 1;
        }

        if added == 0 {
            stalled += 1;
        } else {
            stalled = 0;
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(n: usize) -> Vec<TeamName> {
        (0..n).map(|i| format!("Team {:02}", i)).collect()
    }

    fn appearances(pairs: &[(TeamName, TeamName)]) -> HashMap<&str, u32> {
        let mut counts = HashMap::new();
        for (a, b) in pairs {
            *counts.entry(a.as_str()).or_insert(0) += 1;
            *counts.entry(b.as_str()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_single_round_uses_each_team_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let teams = names(8);
        let pairs = pair_teams(&teams, 1, &[], &mut rng);

        assert_eq!(pairs.len(), 4);
        assert!(appearances(&pairs).values().all(|&c| c == 1));
    }

    #[test]
    fn test_odd_pool_leaves_one_team_out() {
        let mut rng = StdRng::seed_from_u64(11);
        let pairs = pair_teams(&names(5), 1, &[], &mut rng);

        assert_eq!(pairs.len(), 2);
        assert_eq!(appearances(&pairs).len(), 4);
    }

    #[test]
    fn test_multiple_matches_never_repeat_a_pairing() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pairs = pair_teams(&names(6), 3, &[], &mut rng);

            let mut seen = HashSet::new();
            for (a, b) in &pairs {
                assert_ne!(a, b);
                let key = if a < b { (a, b) } else { (b, a) };
                assert!(seen.insert(key), "repeated pairing {:?}", key);
            }
            assert!(appearances(&pairs).values().all(|&c| c <= 3));
        }
    }

    #[test]
    fn test_quota_beyond_pool_is_capped() {
        let mut rng = StdRng::seed_from_u64(3);
        // Three teams can only form three distinct pairings
        let pairs = pair_teams(&names(3), 5, &[], &mut rng);
        assert!(pairs.len() <= 3);
    }

    #[test]
    fn test_too_few_teams() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pair_teams(&names(1), 1, &[], &mut rng).is_empty());
        assert!(pair_teams(&[], 1, &[], &mut rng).is_empty());
        assert!(pair_teams(&names(4), 0, &[], &mut rng).is_empty());
    }

    #[test]
    fn test_existing_week_matches_count_toward_quota() {
        let teams: Vec<TeamName> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let scheduled = vec![("A".to_string(), "B".to_string())];

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pairs = pair_teams(&teams, 1, &scheduled, &mut rng);
            assert_eq!(pairs.len(), 1);
            let (a, b) = &pairs[0];
            assert_eq!(pair_key(a, b), (&"C".to_string(), &"D".to_string()));
        }
    }

    #[test]
    fn test_existing_pairings_are_not_repeated() {
        let teams: Vec<TeamName> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        let scheduled = vec![("B".to_string(), "A".to_string())];
        let mut rng = StdRng::seed_from_u64(5);

        // Quota of two leaves room, but the only possible pairing exists already
        assert!(pair_teams(&teams, 2, &scheduled, &mut rng).is_empty());
    }
}
