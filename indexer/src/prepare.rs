//! Turn raw TMDB-style exports into a clean catalog snapshot.

use anyhow::Result;
use reelrank_core::CatalogRecord;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const MISSING_OVERVIEW: &str = "No overview available.";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Genres {
    List(Vec<String>),
    Joined(String),
}

impl Genres {
    fn into_vec(self) -> Vec<String> {
        let raw = match self {
            Genres::List(v) => v,
            Genres::Joined(s) => s.split(',').map(str::to_string).collect(),
        };
        raw.into_iter().map(|g| g.trim().to_string()).filter(|g| !g.is_empty()).collect()
    }
}

/// One raw export row. Accepts the dataset's column names or snake_case.
#[derive(Debug, Default, Deserialize)]
pub struct RawMovie {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(rename = "Movie Name", alias = "title", alias = "movie_name", default)]
    pub title: Option<String>,
    #[serde(rename = "Genres", alias = "genres", default)]
    pub genres: Option<Genres>,
    #[serde(rename = "Overview", alias = "overview", default)]
    pub overview: Option<String>,
    #[serde(rename = "Popularity", alias = "popularity", default)]
    pub popularity: Option<f64>,
    #[serde(rename = "Vote Average", alias = "vote_average", default)]
    pub vote_average: Option<f64>,
    #[serde(rename = "Vote Count", alias = "vote_count", default)]
    pub vote_count: Option<f64>,
    #[serde(rename = "Adult", alias = "adult", default)]
    pub adult: Option<bool>,
    #[serde(rename = "Poster path", alias = "poster_path", default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub read: usize,
    pub dropped_incomplete: usize,
    pub dropped_duplicate: usize,
    pub written: usize,
}

/// Every `.json`/`.jsonl` file under `input`, or `input` itself.
pub fn collect_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

pub fn read_raw(file: &Path) -> Result<Vec<RawMovie>> {
    let reader = BufReader::new(File::open(file)?);
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            rows.push(serde_json::from_str(&line)?);
        }
        return Ok(rows);
    }
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => Ok(arr.into_iter().map(serde_json::from_value).collect::<Result<_, _>>()?),
        serde_json::Value::Object(_) => Ok(vec![serde_json::from_value(json)?]),
        _ => Ok(vec![]),
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.retain(|v| v.is_finite());
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 { (values[mid - 1] + values[mid]) / 2.0 } else { values[mid] }
}

fn min_max(values: &mut [f64]) {
    let (lo, hi) = values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    for v in values.iter_mut() {
        *v = if range > 0.0 { (*v - lo) / range } else { 0.0 };
    }
}

fn external_id(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Drop incomplete rows, impute missing fields, dedupe titles (first wins),
/// optionally rescale the numeric columns to [0, 1].
pub fn clean(rows: Vec<RawMovie>, normalize: bool) -> (Vec<CatalogRecord>, CleanStats) {
    let mut stats = CleanStats { read: rows.len(), ..CleanStats::default() };

    let present = |f: fn(&RawMovie) -> Option<f64>| rows.iter().filter_map(f).collect::<Vec<f64>>();
    let popularity_median = median(present(|r| r.popularity));
    let vote_average_median = median(present(|r| r.vote_average));
    let vote_count_median = median(present(|r| r.vote_count));

    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut records: Vec<CatalogRecord> = Vec::new();
    for row in rows {
        let title = row.title.as_deref().map(str::trim).unwrap_or_default().to_string();
        let genres = row.genres.map(Genres::into_vec).unwrap_or_default();
        if title.is_empty() || genres.is_empty() {
            stats.dropped_incomplete += 1;
            continue;
        }
        if !seen_titles.insert(title.clone()) {
            stats.dropped_duplicate += 1;
            continue;
        }
        let overview = row.overview.filter(|o| !o.trim().is_empty()).unwrap_or_else(|| MISSING_OVERVIEW.to_string());
        let finite = |v: Option<f64>, fallback: f64| v.filter(|x| x.is_finite()).unwrap_or(fallback);
        records.push(CatalogRecord {
            external_id: row.id.and_then(external_id),
            title,
            genres,
            overview,
            popularity: finite(row.popularity, popularity_median).max(0.0),
            vote_average: finite(row.vote_average, vote_average_median) as f32,
            vote_count: finite(row.vote_count, vote_count_median).max(0.0).round() as u32,
            adult: row.adult.unwrap_or(false),
            poster_path: row.poster_path.filter(|p| !p.trim().is_empty()),
        });
    }

    if normalize {
        let mut popularity: Vec<f64> = records.iter().map(|r| r.popularity).collect();
        let mut vote_average: Vec<f64> = records.iter().map(|r| f64::from(r.vote_average)).collect();
        min_max(&mut popularity);
        min_max(&mut vote_average);
        for (r, (p, v)) in records.iter_mut().zip(popularity.into_iter().zip(vote_average)) {
            r.popularity = p;
            r.vote_average = v as f32;
        }
    }

    stats.written = records.len();
    (records, stats)
}
