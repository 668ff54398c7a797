//! Eligibility rules applied before ranking.

use crate::catalog::{genre_key, Catalog, ItemId};
use std::collections::HashSet;

pub const ADULT_AGE: u32 = 18;

/// Items a request may see, in catalog order.
///
/// Minors never see adult items. Genre preferences narrow the set only when at
/// least one preferred genre exists in the catalog, and are dropped again if
/// they would leave nothing to rank.
pub fn eligible(catalog: &Catalog, age: Option<u32>, genre_preferences: &[String]) -> Vec<ItemId> {
    let minor = age.is_some_and(|a| a < ADULT_AGE);
    let by_age: Vec<ItemId> = catalog
        .items()
        .iter()
        .filter(|item| !(minor && item.adult))
        .map(|item| item.id)
        .collect();

    let wanted: HashSet<String> = genre_preferences
        .iter()
        .map(|g| genre_key(g))
        .filter(|g| catalog.has_genre_key(g))
        .collect();
    if wanted.is_empty() {
        return by_age;
    }

    let by_genre: Vec<ItemId> = by_age
        .iter()
        .copied()
        .filter(|&id| catalog.item(id).is_some_and(|item| item.has_any_genre(&wanted)))
        .collect();
    if by_genre.is_empty() {
        tracing::debug!(?genre_preferences, "genre preferences matched no eligible items, falling back");
        return by_age;
    }
    by_genre
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRecord;

    fn rec(title: &str, genres: &[&str], adult: bool) -> CatalogRecord {
        CatalogRecord {
            external_id: None,
            title: title.into(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            overview: String::new(),
            popularity: 1.0,
            vote_average: 0.0,
            vote_count: 0,
            adult,
            poster_path: None,
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_records(vec![
            rec("Alpha", &["Action"], false),
            rec("Beta", &["Romance"], true),
            rec("Gamma", &["Action", "Romance"], false),
            rec("Delta", &["Horror"], true),
        ])
        .unwrap()
    }

    fn prefs(g: &[&str]) -> Vec<String> { g.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn minors_do_not_see_adult_items() {
        assert_eq!(eligible(&catalog(), Some(16), &[]), vec![0, 2]);
        assert_eq!(eligible(&catalog(), Some(18), &[]), vec![0, 1, 2, 3]);
        assert_eq!(eligible(&catalog(), None, &[]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn preferences_restrict_case_insensitively() {
        assert_eq!(eligible(&catalog(), Some(30), &prefs(&["romance"])), vec![1, 2]);
    }

    #[test]
    fn unknown_genres_are_ignored() {
        assert_eq!(eligible(&catalog(), Some(30), &prefs(&["Western"])), vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_genre_match_falls_back_to_age_filter() {
        // Horror exists but only on an adult item
        assert_eq!(eligible(&catalog(), Some(12), &prefs(&["Horror"])), vec![0, 2]);
    }
}
