use crate::catalog::{Catalog, ItemId};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Titles a user picked out of a previous recommendation list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub selected: Vec<String>,
}

impl FeedbackEvent {
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { selected: titles.into_iter().map(Into::into).collect() }
    }
}

/// Resolve every title or none. The first unknown title rejects the whole event.
pub fn resolve(catalog: &Catalog, titles: &[String]) -> Result<Vec<ItemId>> {
    titles
        .iter()
        .map(|title| catalog.id_of(title).ok_or_else(|| EngineError::UnknownItem { title: title.clone() }))
        .collect()
}

/// Credit each resolved id once per occurrence. Only call with ids from [`resolve`].
pub fn apply(popularity: &mut [f64], ids: &[ItemId], increment: f64) {
    for &id in ids {
        popularity[id as usize] += increment;
    }
}
