use crate::catalog::{Catalog, CatalogRecord, Item, ItemId};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::feedback::{self, FeedbackEvent};
use crate::filter;
use crate::index::TextIndex;
use crate::querylog::{self, EntryKind, QueryLog, ReplayReport};
use crate::ranker;
use crate::request::QueryRequest;
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: ItemId,
    pub external_id: Option<String>,
    pub title: String,
    pub overview: String,
    pub genres: Vec<String>,
    pub poster_path: Option<String>,
    pub similarity: f32,
    pub popularity: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedbackReceipt {
    /// Number of item credits applied.
    pub applied: usize,
    /// Log sequence of the stored event; `None` for an empty event.
    pub seq: Option<u64>,
}

/// An item together with its popularity at the time of the call.
#[derive(Debug, Clone, Serialize)]
pub struct ItemSnapshot {
    #[serde(flatten)]
    pub item: Item,
    pub popularity: f64,
}

/// The ready-to-serve engine. Only [`Recommender::initialize`] creates one,
/// and it returns after the query log has been replayed.
pub struct Recommender {
    catalog: Catalog,
    index: TextIndex,
    config: EngineConfig,
    log: QueryLog,
    /// Single feedback writer: held across resolve, append and apply. Ranking never takes it.
    writer: Mutex<()>,
    replay: ReplayReport,
}

impl Recommender {
    pub fn initialize(records: Vec<CatalogRecord>, log: QueryLog, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut catalog = Catalog::from_records(records)?;
        let index = TextIndex::build(&catalog, config.idf)?;
        let replay = querylog::replay(&mut catalog, &log, config.feedback_increment)?;
        tracing::info!(items = catalog.len(), vocabulary = index.vocabulary_size(), "recommender ready");
        Ok(Self { catalog, index, config, log, writer: Mutex::new(()), replay })
    }

    pub fn recommend(&self, request: &QueryRequest) -> Vec<Recommendation> {
        let preferences = self.genre_preferences(request);
        let candidates = filter::eligible(&self.catalog, request.age, &preferences);
        let query = self.index.project(&request.query_text());
        let ranked = {
            let popularity = self.catalog.popularity();
            ranker::rank(&query, &candidates, &self.index, &popularity, self.config.weights, request.count)
        };
        tracing::debug!(candidates = candidates.len(), returned = ranked.len(), query_terms = query.entries().len(), "recommend");

        let results: Vec<Recommendation> = ranked
            .into_iter()
            .filter_map(|r| {
                let item = self.catalog.item(r.id)?;
                Some(Recommendation {
                    id: r.id,
                    external_id: item.external_id.clone(),
                    title: item.title.clone(),
                    overview: item.overview.clone(),
                    genres: item.genres.clone(),
                    poster_path: item.poster_path.clone(),
                    similarity: r.similarity,
                    popularity: r.popularity,
                    score: r.score,
                })
            })
            .collect();

        if self.config.log_recommendations {
            let titles = results.iter().map(|r| r.title.clone()).collect();
            if let Err(err) = self.log.append(EntryKind::Recommendation, Some(request.clone()), titles) {
                tracing::warn!(%err, "failed to record recommendation in query log");
            }
        }
        results
    }

    /// Credit every selected item, or none if any title is unknown.
    ///
    /// The event is durable in the query log before popularity changes; a
    /// failed append leaves the catalog untouched.
    pub fn submit_feedback(&self, event: &FeedbackEvent) -> Result<FeedbackReceipt> {
        if event.selected.is_empty() {
            return Ok(FeedbackReceipt { applied: 0, seq: None });
        }
        let _writer = self.writer.lock();
        let ids = feedback::resolve(&self.catalog, &event.selected)?;
        let titles = ids.iter().filter_map(|&id| self.catalog.item(id)).map(|item| item.title.clone()).collect();
        let entry = self.log.append(EntryKind::Feedback, None, titles)?;
        feedback::apply(&mut self.catalog.popularity_write(), &ids, self.config.feedback_increment);
        tracing::info!(seq = entry.seq, applied = ids.len(), "feedback applied");
        Ok(FeedbackReceipt { applied: ids.len(), seq: Some(entry.seq) })
    }

    pub fn item(&self, id: ItemId) -> Option<ItemSnapshot> {
        let item = self.catalog.item(id)?.clone();
        let popularity = self.catalog.popularity()[id as usize];
        Some(ItemSnapshot { item, popularity })
    }

    pub fn item_by_title(&self, title: &str) -> Option<ItemSnapshot> {
        self.catalog.id_of(title).and_then(|id| self.item(id))
    }

    pub fn popularity_snapshot(&self) -> Vec<f64> { self.catalog.popularity_snapshot() }

    pub fn replay_report(&self) -> ReplayReport { self.replay }

    pub fn catalog(&self) -> &Catalog { &self.catalog }

    pub fn index(&self) -> &TextIndex { &self.index }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Explicit preferences win; otherwise fall back to the gender table.
    fn genre_preferences(&self, request: &QueryRequest) -> Vec<String> {
        if !request.genre_preferences.is_empty() {
            return request.genre_preferences.clone();
        }
        request
            .gender
            .as_deref()
            .and_then(|g| self.config.genres_for_gender(g))
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }
}
