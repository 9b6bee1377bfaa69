//! Elo-style rating updates for finished games.
//!
//! The landlord plays one pairing against each peasant. For a peasant with
//! rating `R_p` and a landlord with rating `R_L`:
//!
//! ```text
//! expected = 1 / (1 + 10^((R_p - R_L) / 400))
//! term     = K * (landlord_won - expected)
//! ```
//!
//! The landlord gains the sum of all terms and each peasant loses its own
//! term, so every resolution is zero-sum.

pub mod store;

pub use store::{FileRatingStore, MemoryRatingStore, RatingStore};

use crate::connection::Role;
use crate::error::{RatingError, StoreError};
use crate::messaging::RatingDelta;
use tracing::info;

/// Rating assumed for names the store has never seen.
pub const DEFAULT_RATING: f64 = 1500.0;

/// Rating difference that multiplies the odds by ten.
pub const RATING_SCALE: f64 = 400.0;

/// Expected score of the landlord against one peasant.
///
/// Extreme differences use the limit value so the result stays finite.
pub fn expected_score(peasant: f64, landlord: f64) -> f64 {
    let diff = (peasant - landlord) / RATING_SCALE;
    if diff.abs() >= 100.0 {
        if diff < 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 / (1.0 + 10f64.powf(diff))
    }
}

/// Per-pairing landlord gains, one per peasant rating, in input order.
pub fn pairing_terms(landlord: f64, peasants: &[f64], landlord_won: bool, k: u32) -> Vec<f64> {
    let outcome = if landlord_won { 1.0 } else { 0.0 };
    peasants
        .iter()
        .map(|peasant| f64::from(k) * (outcome - expected_score(*peasant, landlord)))
        .collect()
}

/// Resolves a finished game against `store`.
///
/// `participants` are the engaged players with their roles; exactly one
/// must be the landlord and at least one a peasant. Every participant's
/// rating is read before anything is written, and the store is committed
/// once at the end. If the commit fails the staged ratings are rolled back,
/// so a failed resolution leaves every rating as it was.
///
/// # Returns
///
/// The changes sorted by descending delta, with `winner` always first.
pub async fn resolve(
    store: &mut dyn RatingStore,
    participants: &[(String, Role)],
    winner: &str,
    k: u32,
) -> Result<Vec<RatingDelta>, RatingError> {
    let landlords: Vec<&String> = participants
        .iter()
        .filter(|(_, role)| *role == Role::Landlord)
        .map(|(name, _)| name)
        .collect();
    let peasants: Vec<&String> = participants
        .iter()
        .filter(|(_, role)| matches!(role, Role::Peasant(_)))
        .map(|(name, _)| name)
        .collect();

    let landlord = match landlords.as_slice() {
        [] => return Err(RatingError::NoLandlord),
        [one] => *one,
        many => return Err(RatingError::MultipleLandlords(many.len())),
    };
    if peasants.is_empty() {
        return Err(RatingError::NoPeasants);
    }

    let landlord_rating = store.get(landlord).await?;
    let mut peasant_ratings = Vec::with_capacity(peasants.len());
    for name in &peasants {
        peasant_ratings.push(store.get(name).await?);
    }

    let terms = pairing_terms(landlord_rating, &peasant_ratings, winner == landlord.as_str(), k);
    let landlord_delta: f64 = terms.iter().sum();

    let mut changes = Vec::with_capacity(peasants.len() + 1);
    changes.push(RatingDelta {
        name: landlord.clone(),
        delta: landlord_delta,
        rating: landlord_rating + landlord_delta,
    });
    for ((name, rating), term) in peasants.iter().zip(&peasant_ratings).zip(&terms) {
        changes.push(RatingDelta {
            name: (*name).clone(),
            delta: -term,
            rating: rating - term,
        });
    }

    if let Err(e) = persist(store, &changes).await {
        store.rollback();
        return Err(e.into());
    }

    changes.sort_by(|a, b| {
        (a.name != winner)
            .cmp(&(b.name != winner))
            .then(b.delta.total_cmp(&a.delta))
    });

    info!("🏆 {} won, K = {}, landlord delta {:+.3}", winner, k, landlord_delta);
    Ok(changes)
}

async fn persist(store: &mut dyn RatingStore, changes: &[RatingDelta]) -> Result<(), StoreError> {
    for change in changes {
        store.set(&change.name, change.rating).await?;
    }
    store.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(names: &[(&str, Role)]) -> Vec<(String, Role)> {
        names.iter().map(|(n, r)| (n.to_string(), *r)).collect()
    }

    #[test]
    fn test_expected_score_is_symmetric_around_equal_ratings() {
        assert!((expected_score(1500.0, 1500.0) - 0.5).abs() < 1e-12);
        let stronger_landlord = expected_score(1500.0, 1900.0);
        assert!((stronger_landlord - 10.0 / 11.0).abs() < 1e-12);
        assert!((expected_score(1900.0, 1500.0) + stronger_landlord - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_expected_score_stays_finite_for_extreme_gaps() {
        assert_eq!(expected_score(0.0, 1e9), 1.0);
        assert_eq!(expected_score(1e9, 0.0), 0.0);
    }

    #[tokio::test]
    async fn test_landlord_win_is_zero_sum() {
        let mut store = MemoryRatingStore::with_ratings([("b", 1620.0), ("a", 1480.0)]);
        let participants = seats(&[("b", Role::Landlord), ("a", Role::Peasant(1)), ("c", Role::Peasant(2))]);

        let changes = resolve(&mut store, &participants, "b", 64).await.unwrap();

        let total: f64 = changes.iter().map(|c| c.delta).sum();
        assert!(total.abs() < 1e-9);
        assert_eq!(changes[0].name, "b");
        assert!(changes[0].delta > 0.0);
        for change in &changes {
            assert_eq!(store.get(&change.name).await.unwrap(), change.rating);
        }
    }

    #[tokio::test]
    async fn test_equal_ratings_split_k_per_pairing() {
        let mut store = MemoryRatingStore::new();
        let participants = seats(&[("l", Role::Landlord), ("p1", Role::Peasant(1)), ("p2", Role::Peasant(2))]);

        let changes = resolve(&mut store, &participants, "l", 64).await.unwrap();

        assert_eq!(changes[0].name, "l");
        assert_eq!(changes[0].delta, 64.0);
        assert_eq!(changes[0].rating, 1564.0);
        assert_eq!(changes[1].delta, -32.0);
        assert_eq!(changes[2].delta, -32.0);
    }

    #[tokio::test]
    async fn test_peasant_winner_is_pinned_first() {
        let mut store = MemoryRatingStore::with_ratings([("p2", 1300.0)]);
        let participants = seats(&[("l", Role::Landlord), ("p1", Role::Peasant(1)), ("p2", Role::Peasant(2))]);

        let changes = resolve(&mut store, &participants, "p1", 32).await.unwrap();

        // p2 is rated lower and gains more, but the winner still leads
        assert_eq!(changes[0].name, "p1");
        assert_eq!(changes[1].name, "p2");
        assert!(changes[1].delta > changes[0].delta);
        assert_eq!(changes[2].name, "l");
        assert!(changes[2].delta < 0.0);
    }

    #[tokio::test]
    async fn test_resolution_requires_one_landlord_and_a_peasant() {
        let mut store = MemoryRatingStore::new();

        let no_landlord = seats(&[("a", Role::Peasant(1))]);
        assert!(matches!(
            resolve(&mut store, &no_landlord, "a", 64).await,
            Err(RatingError::NoLandlord)
        ));

        let no_peasants = seats(&[("a", Role::Landlord), ("b", Role::Unassigned)]);
        assert!(matches!(
            resolve(&mut store, &no_peasants, "a", 64).await,
            Err(RatingError::NoPeasants)
        ));

        let two_landlords = seats(&[("a", Role::Landlord), ("b", Role::Landlord), ("c", Role::Peasant(1))]);
        assert!(matches!(
            resolve(&mut store, &two_landlords, "a", 64).await,
            Err(RatingError::MultipleLandlords(2))
        ));

        assert_eq!(store.get("a").await.unwrap(), DEFAULT_RATING);
    }

    #[tokio::test]
    async fn test_failed_commit_touches_no_rating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("ratings.json");
        let mut store = FileRatingStore::open(&path).await.unwrap();
        let participants = seats(&[("l", Role::Landlord), ("p", Role::Peasant(1))]);

        let result = resolve(&mut store, &participants, "l", 64).await;

        assert!(matches!(result, Err(RatingError::Store(StoreError::Write(..)))));
        assert_eq!(store.get("l").await.unwrap(), DEFAULT_RATING);
        assert_eq!(store.get("p").await.unwrap(), DEFAULT_RATING);
    }
}
