//! Seeded MovieLens-style interaction generator.
//!
//! Users carry `sex` and `age` features, items carry a `genre_1` feature.
//! Each user has a favourite genre; ratings for that genre skew high.

use super::{Interaction, Interactions, RawId};
use crate::error::{RecoError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Genres assigned to items round-robin.
pub const GENRES: [&str; 4] = ["crime", "drama", "comedy", "action"];

/// First item id; items are numbered upwards from here.
pub const FIRST_ITEM_ID: i64 = 100;

/// Generator settings.
///
/// # Examples
///
/// ```
/// use aprender_reco::data::synthetic::{generate, SyntheticConfig};
///
/// let data = generate(&SyntheticConfig::default().with_n_users(5)).unwrap();
/// assert_eq!(data.len(), 5 * 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Number of users, ids `1..=n_users`.
    pub n_users: usize,
    /// Number of items, ids starting at [`FIRST_ITEM_ID`].
    pub n_items: usize,
    /// Distinct items rated by each user.
    pub interactions_per_user: usize,
    /// RNG seed.
    pub seed: u64,
    /// Keep only ratings >= 4, relabelled as 1.
    pub positives_only: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_users: 40,
            n_items: 30,
            interactions_per_user: 8,
            seed: 42,
            positives_only: false,
        }
    }
}

impl SyntheticConfig {
    /// Sets the number of users.
    #[must_use]
    pub fn with_n_users(mut self, n_users: usize) -> Self {
        self.n_users = n_users;
        self
    }

    /// Sets the number of items.
    #[must_use]
    pub fn with_n_items(mut self, n_items: usize) -> Self {
        self.n_items = n_items;
        self
    }

    /// Sets the number of items per user.
    #[must_use]
    pub fn with_interactions_per_user(mut self, n: usize) -> Self {
        self.interactions_per_user = n;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Produces implicit-feedback data (label 1 for liked items only).
    #[must_use]
    pub fn positives_only(mut self) -> Self {
        self.positives_only = true;
        self
    }
}

/// Generates interactions.
///
/// # Errors
///
/// Returns an error if any size is zero or a user would need more distinct
/// items than exist.
pub fn generate(config: &SyntheticConfig) -> Result<Interactions> {
    if config.n_users == 0 || config.n_items == 0 || config.interactions_per_user == 0 {
        return Err(RecoError::invalid_input(
            "synthetic sizes must be non-zero",
        ));
    }
    if config.interactions_per_user > config.n_items {
        return Err(RecoError::InvalidHyperparameter {
            param: "interactions_per_user".to_string(),
            value: config.interactions_per_user.to_string(),
            constraint: format!("<= n_items ({})", config.n_items),
        });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut rows = Vec::with_capacity(config.n_users * config.interactions_per_user);

    for u in 0..config.n_users {
        let user = RawId::Int(u as i64 + 1);
        let sex = if u % 2 == 0 { "male" } else { "female" };
        let age = 18.0 + ((u * 7) % 40) as f32;
        let favourite = rng.gen_range(0..GENRES.len());

        let picks = rand::seq::index::sample(&mut rng, config.n_items, config.interactions_per_user);
        for j in picks {
            let genre = j % GENRES.len();
            let rating: f32 = if genre == favourite {
                f32::from(rng.gen_range(4_u8..=5))
            } else {
                f32::from(rng.gen_range(1_u8..=3))
            };
            if config.positives_only && rating < 4.0 {
                continue;
            }
            let label = if config.positives_only { 1.0 } else { rating };
            rows.push(
                Interaction::new(user.clone(), FIRST_ITEM_ID + j as i64, label)
                    .with_feat("sex", sex)
                    .with_feat("age", age)
                    .with_feat("genre_1", GENRES[genre]),
            );
        }
    }

    tracing::debug!(rows = rows.len(), seed = config.seed, "generated synthetic interactions");
    Ok(Interactions::new(rows))
}
