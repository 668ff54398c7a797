use crate::error::{EngineError, Result};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub type ItemId = u32;

/// One row of a catalog snapshot as produced by the prepare step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub external_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub external_id: Option<String>,
    pub title: String,
    pub genres: Vec<String>,
    pub overview: String,
    /// Lowercased title, genres and overview; the text that gets indexed.
    #[serde(skip)]
    pub content: String,
    pub vote_average: f32,
    pub vote_count: u32,
    pub adult: bool,
    pub poster_path: Option<String>,
    #[serde(skip)]
    genre_keys: Vec<String>,
}

impl Item {
    pub fn has_any_genre(&self, wanted: &HashSet<String>) -> bool {
        self.genre_keys.iter().any(|g| wanted.contains(g))
    }
}

/// The loaded item set. Everything but popularity is frozen at load time.
pub struct Catalog {
    items: Vec<Item>,
    by_title: HashMap<String, ItemId>,
    genre_keys: HashSet<String>,
    popularity: RwLock<Vec<f64>>,
}

pub(crate) fn genre_key(genre: &str) -> String { genre.trim().to_lowercase() }

impl Catalog {
    /// Validate records and assign ids in input order.
    pub fn from_records(records: Vec<CatalogRecord>) -> Result<Self> {
        let mut items = Vec::with_capacity(records.len());
        let mut popularity = Vec::with_capacity(records.len());
        let mut by_title: HashMap<String, ItemId> = HashMap::with_capacity(records.len());
        let mut genre_keys = HashSet::new();

        for rec in records {
            let title = rec.title.trim().to_string();
            if title.is_empty() {
                return Err(EngineError::EmptyTitle { position: items.len() });
            }
            if !rec.popularity.is_finite() || rec.popularity < 0.0 {
                return Err(EngineError::InvalidPopularity { title, value: rec.popularity });
            }
            let id = items.len() as ItemId;
            if by_title.insert(title.clone(), id).is_some() {
                return Err(EngineError::DuplicateTitle { title });
            }
            let keys: Vec<String> = rec.genres.iter().map(|g| genre_key(g)).filter(|g| !g.is_empty()).collect();
            genre_keys.extend(keys.iter().cloned());
            let content = format!("{} {} {}", title, rec.genres.join(" "), rec.overview).to_lowercase();
            items.push(Item {
                id,
                external_id: rec.external_id,
                title,
                genres: rec.genres,
                overview: rec.overview,
                content,
                vote_average: rec.vote_average,
                vote_count: rec.vote_count,
                adult: rec.adult,
                poster_path: rec.poster_path,
                genre_keys: keys,
            });
            popularity.push(rec.popularity);
        }

        Ok(Self { items, by_title, genre_keys, popularity: RwLock::new(popularity) })
    }

    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn items(&self) -> &[Item] { &self.items }
    pub fn item(&self, id: ItemId) -> Option<&Item> { self.items.get(id as usize) }

    pub fn id_of(&self, title: &str) -> Option<ItemId> { self.by_title.get(title.trim()).copied() }

    /// Whether any item carries this genre (lowercased key).
    pub fn has_genre_key(&self, key: &str) -> bool { self.genre_keys.contains(key) }

    /// Shared view of the popularity column. Hold it for the whole ranking pass.
    pub fn popularity(&self) -> RwLockReadGuard<'_, Vec<f64>> { self.popularity.read() }

    pub(crate) fn popularity_write(&self) -> RwLockWriteGuard<'_, Vec<f64>> { self.popularity.write() }

    /// Lock-free access for the exclusive startup phase.
    pub(crate) fn popularity_mut(&mut self) -> &mut Vec<f64> { self.popularity.get_mut() }

    pub fn popularity_snapshot(&self) -> Vec<f64> { self.popularity.read().clone() }
}

/// Load catalog records from a JSON array file or a JSON Lines file (`.jsonl`).
pub fn load_catalog<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<CatalogRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    } else {
        Ok(serde_json::from_reader(reader)?)
    }
}
