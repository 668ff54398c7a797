use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Inverse document frequency formula used when building the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfScheme {
    /// ln((1 + N) / (1 + df)) + 1; positive even for a single-item catalog.
    #[default]
    Smooth,
    /// ln(N / df)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankWeights {
    pub similarity: f64,
    pub popularity: f64,
}

impl Default for RankWeights {
    fn default() -> Self { Self { similarity: 0.7, popularity: 0.3 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: RankWeights,
    /// Popularity added per selected item in a feedback event.
    pub feedback_increment: f64,
    pub idf: IdfScheme,
    /// Append an audit entry to the query log for every recommendation request.
    pub log_recommendations: bool,
    /// Genre preferences assumed for a gender when a request names none. Keys are lowercase.
    pub gender_genres: BTreeMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut gender_genres = BTreeMap::new();
        gender_genres.insert("male".to_string(), strings(&["Action", "Adventure", "Science Fiction", "Thriller"]));
        gender_genres.insert("female".to_string(), strings(&["Drama", "Romance", "Comedy", "Fantasy"]));
        gender_genres.insert("other".to_string(), strings(&["Documentary", "Animation", "Family", "Mystery"]));
        Self {
            weights: RankWeights::default(),
            feedback_increment: 1.0,
            idf: IdfScheme::default(),
            log_recommendations: true,
            gender_genres,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> { items.iter().map(|s| s.to_string()).collect() }

impl EngineConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let RankWeights { similarity, popularity } = self.weights;
        for (name, w) in [("similarity", similarity), ("popularity", popularity)] {
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::InvalidConfig(format!("{name} weight must be finite and non-negative, got {w}")));
            }
        }
        if similarity + popularity == 0.0 {
            return Err(EngineError::InvalidConfig("weights must not both be zero".into()));
        }
        if !self.feedback_increment.is_finite() || self.feedback_increment < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "feedback increment must be finite and non-negative, got {}",
                self.feedback_increment
            )));
        }
        Ok(())
    }

    /// Genre preferences implied by `gender`, if the table has an entry for it.
    pub fn genres_for_gender(&self, gender: &str) -> Option<&[String]> {
        self.gender_genres.get(&gender.trim().to_lowercase()).map(Vec::as_slice)
    }
}
