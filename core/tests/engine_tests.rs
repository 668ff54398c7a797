use reelrank_core::querylog::LOG_TREE;
use reelrank_core::{
    CatalogRecord, EngineConfig, EngineError, EntryKind, FeedbackEvent, QueryLog, QueryRequest, Recommender,
};
use std::path::Path;

fn rec(title: &str, genres: &[&str], overview: &str, popularity: f64, adult: bool) -> CatalogRecord {
    CatalogRecord {
        external_id: None,
        title: title.into(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        overview: overview.into(),
        popularity,
        vote_average: 7.0,
        vote_count: 100,
        adult,
        poster_path: Some(format!("/{}.jpg", title.to_lowercase())),
    }
}

fn alpha_beta() -> Vec<CatalogRecord> {
    vec![
        rec("Alpha", &[], "space heroic battle", 1.0, false),
        rec("Beta", &[], "romantic comedy", 1.0, false),
    ]
}

fn movies() -> Vec<CatalogRecord> {
    vec![
        rec("Star Raiders", &["Action", "Science Fiction"], "A heroic pilot leads a battle across space", 40.0, false),
        rec("Midnight Desire", &["Romance", "Drama"], "An adult love story set in Paris", 25.0, true),
        rec("Laugh Lines", &["Comedy"], "A romantic comedy about two rival bakers", 10.0, false),
        rec("Deep Blue Heist", &["Thriller", "Crime"], "A crew plans a heist beneath the ocean", 30.0, false),
        rec("Night Terrors", &["Horror"], "Adult horror in an abandoned asylum", 15.0, true),
        rec("Little Explorers", &["Animation", "Family"], "Kids explore space on a homemade rocket", 20.0, false),
    ]
}

fn engine(records: Vec<CatalogRecord>) -> Recommender {
    Recommender::initialize(records, QueryLog::temporary().unwrap(), EngineConfig::default()).unwrap()
}

fn titles(results: &[reelrank_core::Recommendation]) -> Vec<&str> { results.iter().map(|r| r.title.as_str()).collect() }

#[test]
fn heroic_space_query_prefers_alpha() {
    let engine = engine(alpha_beta());
    let out = engine.recommend(&QueryRequest::new("heroic battle in space", 1));
    assert_eq!(titles(&out), vec!["Alpha"]);
    assert!(out[0].similarity > 0.0);
}

#[test]
fn recommend_is_deterministic() {
    let engine = engine(movies());
    let req = QueryRequest::new("space battle heist", 4).with_age(30);
    let first = engine.recommend(&req);
    for _ in 0..5 {
        assert_eq!(engine.recommend(&req), first);
    }
}

#[test]
fn minors_never_get_adult_items() {
    let engine = engine(movies());
    for query in ["adult love story paris", "horror asylum", "space", ""] {
        let out = engine.recommend(&QueryRequest::new(query, 10).with_age(15));
        assert!(!out.is_empty());
        for r in &out {
            assert!(!engine.item(r.id).unwrap().item.adult, "{} leaked to a minor", r.title);
        }
    }
}

#[test]
fn result_size_is_bounded() {
    let engine = engine(movies());
    assert_eq!(engine.recommend(&QueryRequest::new("space", 3)).len(), 3);
    assert_eq!(engine.recommend(&QueryRequest::new("space", 50)).len(), 6);
    assert_eq!(engine.recommend(&QueryRequest::new("space", 50).with_age(10)).len(), 4);
    assert!(engine.recommend(&QueryRequest::new("space", 0)).is_empty());
}

#[test]
fn genre_preferences_restrict_then_fall_back() {
    let engine = engine(movies());
    let comedy = engine.recommend(&QueryRequest::new("space", 10).with_age(30).with_genres(["comedy"]));
    assert_eq!(titles(&comedy), vec!["Laugh Lines"]);

    // Horror exists only on adult items, so a minor falls back to every age-eligible item
    let horror = engine.recommend(&QueryRequest::new("asylum", 10).with_age(12).with_genres(["Horror"]));
    assert_eq!(horror.len(), 4);
}

#[test]
fn gender_implies_genres_when_none_given() {
    let engine = engine(movies());
    let out = engine.recommend(&QueryRequest::new("ocean", 10).with_age(30).with_gender("male"));
    let mut got = titles(&out);
    got.sort();
    assert_eq!(got, vec!["Deep Blue Heist", "Star Raiders"]);

    // Explicit preferences override the gender table
    let out = engine.recommend(&QueryRequest::new("ocean", 10).with_age(30).with_gender("male").with_genres(["Family"]));
    assert_eq!(titles(&out), vec!["Little Explorers"]);
}

#[test]
fn only_an_all_adult_catalog_is_empty_for_minors() {
    let engine = engine(vec![rec("Only Adult", &["Drama"], "grown up drama", 5.0, true)]);
    assert!(engine.recommend(&QueryRequest::new("drama", 5).with_age(16)).is_empty());
    assert_eq!(engine.recommend(&QueryRequest::new("drama", 5).with_age(40)).len(), 1);
}

#[test]
fn feedback_credits_known_items() {
    let engine = engine(alpha_beta());
    let receipt = engine.submit_feedback(&FeedbackEvent::new(["Alpha"])).unwrap();
    assert_eq!(receipt.applied, 1);
    assert!(receipt.seq.is_some());
    assert_eq!(engine.item_by_title("Alpha").unwrap().popularity, 2.0);
    assert_eq!(engine.item_by_title("Beta").unwrap().popularity, 1.0);
}

#[test]
fn unknown_item_rejects_whole_event() {
    let engine = engine(alpha_beta());
    let err = engine.submit_feedback(&FeedbackEvent::new(["Gamma"])).unwrap_err();
    assert!(matches!(err, EngineError::UnknownItem { ref title } if title == "Gamma"));

    let err = engine.submit_feedback(&FeedbackEvent::new(["Alpha", "Gamma", "Beta"])).unwrap_err();
    assert!(matches!(err, EngineError::UnknownItem { .. }));
    assert_eq!(engine.popularity_snapshot(), vec![1.0, 1.0]);
}

#[test]
fn empty_feedback_is_a_noop() {
    let engine = engine(alpha_beta());
    let receipt = engine.submit_feedback(&FeedbackEvent::default()).unwrap();
    assert_eq!(receipt.applied, 0);
    assert_eq!(receipt.seq, None);
}

#[test]
fn feedback_shifts_ranking_through_popularity() {
    let engine = engine(vec![rec("One", &[], "drama", 1.0, false), rec("Two", &[], "drama", 1.0, false)]);
    let before = engine.recommend(&QueryRequest::new("drama", 2));
    assert_eq!(titles(&before), vec!["One", "Two"]);
    engine.submit_feedback(&FeedbackEvent::new(["Two"])).unwrap();
    let after = engine.recommend(&QueryRequest::new("drama", 2));
    assert_eq!(titles(&after), vec!["Two", "One"]);
}

#[test]
fn empty_catalog_cannot_initialize() {
    let result = Recommender::initialize(vec![], QueryLog::temporary().unwrap(), EngineConfig::default());
    assert!(matches!(result, Err(EngineError::EmptyCatalog)));
}

#[test]
fn duplicate_titles_cannot_initialize() {
    let records = vec![rec("Alpha", &[], "a", 1.0, false), rec("Alpha", &[], "b", 1.0, false)];
    let result = Recommender::initialize(records, QueryLog::temporary().unwrap(), EngineConfig::default());
    assert!(matches!(result, Err(EngineError::DuplicateTitle { .. })));
}

fn seed_log(dir: &Path, credits: &[&[&str]]) {
    let log = QueryLog::open(dir).unwrap();
    for titles in credits {
        log.append(EntryKind::Feedback, None, titles.iter().map(|t| t.to_string()).collect()).unwrap();
    }
}

#[test]
fn replay_restores_logged_credits() {
    let dir = tempfile::tempdir().unwrap();
    seed_log(dir.path(), &[&["Alpha"], &["Alpha"]]);

    let engine = Recommender::initialize(alpha_beta(), QueryLog::open(dir.path()).unwrap(), EngineConfig::default()).unwrap();
    assert_eq!(engine.item_by_title("Alpha").unwrap().popularity, 3.0);
    assert_eq!(engine.item_by_title("Beta").unwrap().popularity, 1.0);
    assert_eq!(engine.replay_report().applied, 2);
}

#[test]
fn live_feedback_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let before = {
        let engine = Recommender::initialize(alpha_beta(), QueryLog::open(dir.path()).unwrap(), EngineConfig::default()).unwrap();
        engine.submit_feedback(&FeedbackEvent::new(["Beta", "Alpha"])).unwrap();
        engine.submit_feedback(&FeedbackEvent::new(["Beta"])).unwrap();
        assert!(engine.submit_feedback(&FeedbackEvent::new(["Nope"])).is_err());
        engine.recommend(&QueryRequest::new("comedy", 2));
        engine.popularity_snapshot()
    };
    let engine = Recommender::initialize(alpha_beta(), QueryLog::open(dir.path()).unwrap(), EngineConfig::default()).unwrap();
    assert_eq!(engine.popularity_snapshot(), before);
    assert_eq!(before, vec![2.0, 3.0]);
    let report = engine.replay_report();
    assert_eq!((report.applied, report.skipped, report.audited), (2, 0, 1));
}

#[test]
fn replay_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    seed_log(dir.path(), &[&["Alpha"], &["Beta", "Alpha"], &["Beta"]]);
    let run = || {
        let engine = Recommender::initialize(alpha_beta(), QueryLog::open(dir.path()).unwrap(), EngineConfig::default()).unwrap();
        engine.popularity_snapshot()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first, vec![3.0, 3.0]);
}

#[test]
fn replay_skips_malformed_and_stale_entries() {
    let dir = tempfile::tempdir().unwrap();
    seed_log(dir.path(), &[&["Alpha"], &["Retired Movie"], &["Alpha"]]);
    {
        let db = sled::open(dir.path()).unwrap();
        db.open_tree(LOG_TREE).unwrap().insert((u64::MAX - 1).to_be_bytes(), &b"not bincode"[..]).unwrap();
        db.flush().unwrap();
    }

    let engine = Recommender::initialize(alpha_beta(), QueryLog::open(dir.path()).unwrap(), EngineConfig::default()).unwrap();
    assert_eq!(engine.item_by_title("Alpha").unwrap().popularity, 3.0);
    let report = engine.replay_report();
    assert_eq!(report.applied, 2);
    assert_eq!(report.skipped, 2);
}

#[test]
fn configured_increment_and_weights_apply() {
    let config = EngineConfig { feedback_increment: 0.25, ..EngineConfig::default() };
    let engine = Recommender::initialize(alpha_beta(), QueryLog::temporary().unwrap(), config).unwrap();
    engine.submit_feedback(&FeedbackEvent::new(["Beta"])).unwrap();
    assert_eq!(engine.item_by_title("Beta").unwrap().popularity, 1.25);

    let bad = EngineConfig { feedback_increment: f64::NAN, ..EngineConfig::default() };
    assert!(matches!(
        Recommender::initialize(alpha_beta(), QueryLog::temporary().unwrap(), bad),
        Err(EngineError::InvalidConfig(_))
    ));
}

#[test]
fn concurrent_feedback_loses_no_increments() {
    let engine = std::sync::Arc::new(engine(alpha_beta()));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let title = if i % 2 == 0 { "Alpha" } else { "Beta" };
                    engine.submit_feedback(&FeedbackEvent::new([title])).unwrap();
                    engine.recommend(&QueryRequest::new("space", 1));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(engine.popularity_snapshot(), vec![101.0, 101.0]);
}
