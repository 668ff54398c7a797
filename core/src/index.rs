use crate::catalog::{Catalog, ItemId};
use crate::config::IdfScheme;
use crate::error::{EngineError, Result};
use crate::tokenizer::tokenize;
use std::collections::{HashMap, HashSet};

pub type TermId = u32;

/// Sparse weight vector sorted by term id. Non-zero vectors are L2-normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(TermId, f32)>,
}

impl SparseVector {
    fn normalized(weights: HashMap<TermId, f32>) -> Self {
        let mut entries: Vec<(TermId, f32)> = weights.into_iter().filter(|(_, w)| *w != 0.0).collect();
        entries.sort_by_key(|(tid, _)| *tid);
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() { *w /= norm; }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[(TermId, f32)] { &self.entries }

    pub fn is_zero(&self) -> bool { self.entries.is_empty() }

    pub fn norm(&self) -> f32 { self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt() }

    /// Dot product by merging the two sorted entry lists.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (a, b) = (&self.entries, &other.entries);
        let (mut i, mut j, mut acc) = (0, 0, 0.0f32);
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += a[i].1 * b[j].1;
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

#[inline]
fn sublinear_tf(tf_raw: u32) -> f32 { if tf_raw > 0 { 1.0 + (tf_raw as f32).ln() } else { 0.0 } }

/// TF-IDF vector space over the catalog content, built once and never refit.
#[derive(Debug, Clone)]
pub struct TextIndex {
    dictionary: HashMap<String, TermId>,
    df: Vec<u32>,
    idf: Vec<f32>,
    vectors: Vec<SparseVector>,
    num_docs: u32,
}

impl TextIndex {
    pub fn build(catalog: &Catalog, scheme: IdfScheme) -> Result<Self> {
        if catalog.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }

        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        let mut tf_per_doc: Vec<HashMap<TermId, u32>> = Vec::with_capacity(catalog.len());

        // First pass: dictionary, document frequencies and raw term counts
        for item in catalog.items() {
            let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
            let mut seen_in_doc: HashSet<TermId> = HashSet::new();
            for term in tokenize(&item.content) {
                let tid = *dictionary.entry(term).or_insert_with(|| {
                    df.push(0);
                    (df.len() - 1) as TermId
                });
                *tf_counts.entry(tid).or_insert(0) += 1;
                if seen_in_doc.insert(tid) {
                    df[tid as usize] += 1;
                }
            }
            tf_per_doc.push(tf_counts);
        }

        if dictionary.is_empty() {
            return Err(EngineError::EmptyVocabulary);
        }

        let n = catalog.len() as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|&df_t| {
                let df_t = df_t.max(1) as f32;
                match scheme {
                    IdfScheme::Smooth => ((1.0 + n) / (1.0 + df_t)).ln() + 1.0,
                    IdfScheme::Plain => (n / df_t).ln(),
                }
            })
            .collect();

        // Second pass: weight and normalize per document
        let vectors = tf_per_doc
            .into_iter()
            .map(|counts| {
                let weights = counts.into_iter().map(|(tid, tf_raw)| (tid, sublinear_tf(tf_raw) * idf[tid as usize])).collect();
                SparseVector::normalized(weights)
            })
            .collect();

        tracing::info!(num_docs = catalog.len(), num_terms = dictionary.len(), ?scheme, "text index built");
        Ok(Self { dictionary, df, idf, vectors, num_docs: catalog.len() as u32 })
    }

    /// Map free text into the index space. Terms outside the vocabulary are dropped.
    pub fn project(&self, text: &str) -> SparseVector {
        let mut tf_q_raw: HashMap<TermId, u32> = HashMap::new();
        for term in tokenize(text) {
            if let Some(&tid) = self.dictionary.get(&term) {
                *tf_q_raw.entry(tid).or_insert(0) += 1;
            }
        }
        let weights = tf_q_raw.into_iter().map(|(tid, tf_raw)| (tid, sublinear_tf(tf_raw) * self.idf[tid as usize])).collect();
        SparseVector::normalized(weights)
    }

    pub fn vector(&self, id: ItemId) -> Option<&SparseVector> { self.vectors.get(id as usize) }

    pub fn vocabulary_size(&self) -> usize { self.dictionary.len() }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    pub fn document_frequency(&self, term: &str) -> Option<u32> {
        self.dictionary.get(term).map(|&tid| self.df[tid as usize])
    }
}
