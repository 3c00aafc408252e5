//! Synthetic article generation.
//!
//! Produces a plausible training table without any external data so the
//! pipeline can be demonstrated and tested end to end. Traffic is drawn from a
//! log-normal model in which longer articles, more links, mid-length titles,
//! moderate sentence length, and positive sentiment all help; articles are
//! then labelled at the median exactly as real analytics data is.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{FeatureVector, TrainingSet};
use crate::error::AppError;
use crate::io::ingest::label_by_median;

/// Log-traffic baseline before feature effects.
const BASE_LOG_USERS: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct SampleData {
    pub training: TrainingSet,
    /// Users threshold separating the two labels.
    pub threshold: f64,
}

/// Generate `articles` synthetic articles from a fixed seed.
pub fn generate_sample(articles: usize, seed: u64) -> Result<SampleData, AppError> {
    if articles == 0 {
        return Err(AppError::Config("synthetic article count must be > 0".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let verbosity_dist = Normal::<f64>::new(17.0, 4.0)
        .map_err(|e| AppError::Config(format!("verbosity distribution error: {e}")))?;
    let noise = Normal::<f64>::new(0.0, 0.6)
        .map_err(|e| AppError::Config(format!("traffic noise distribution error: {e}")))?;

    let mut rows: Vec<(FeatureVector, f64)> = Vec::with_capacity(articles);
    for _ in 0..articles {
        let content_length = rng.gen_range(250..=2400) as f64;
        let title_length = rng.gen_range(25..=90) as f64;
        let links = rng.gen_range(0..=12) as f64;
        let verbosity = round_to(verbosity_dist.sample(&mut rng).clamp(6.0, 40.0), 2);
        let sentiment = round_to(rng.gen_range(-1.0..=1.0), 4);

        let log_users = BASE_LOG_USERS
            + 0.0008 * content_length
            + 0.08 * links
            - 0.012 * (title_length - 55.0).abs()
            - 0.03 * (verbosity - 17.0).abs()
            + 0.5 * sentiment
            + noise.sample(&mut rng);
        let users = log_users.exp().round();

        rows.push((
            [content_length, title_length, links, verbosity, sentiment],
            users,
        ));
    }

    let (training, threshold) = label_by_median(rows);
    Ok(SampleData {
        training,
        threshold,
    })
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}
