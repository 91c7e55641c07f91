//! Library-level tests for the matching pipeline, driven through mock
//! embedding providers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sdg_context::embedding::{EmbeddingProvider, HashProvider};
use sdg_context::error::MatchError;
use sdg_context::flatten::Level;
use sdg_context::index::CorpusIndex;
use sdg_context::matcher::Matcher;
use sdg_context::rank::{self, MatchResult};
use sdg_context::taxonomy::{Goal, Taxonomy};

// ============ Mock providers ============

/// Wraps the hash provider and records every batch call.
struct CountingProvider {
    inner: HashProvider,
    calls: AtomicUsize,
    texts: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Self {
        Self {
            inner: HashProvider::new(128).unwrap(),
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for CountingProvider {
    fn model_name(&self) -> &str {
        "counting"
    }
    fn dims(&self) -> usize {
        self.inner.dims()
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

/// Maps keywords onto a few concept axes, so related wording lands close
/// together regardless of the exact words used.
struct ConceptProvider;

const CONCEPTS: &[&[&str]] = &[
    &["child", "children", "infant"],
    &["malnutrition", "stunting", "undernourishment", "wasting"],
    &["hunger", "food", "nutrition", "nutritious", "agriculture"],
    &["health", "maternal", "mortality", "healthy"],
];

impl EmbeddingProvider for ConceptProvider {
    fn model_name(&self) -> &str {
        "concept"
    }
    fn dims(&self) -> usize {
        CONCEPTS.len() + 1
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0; self.dims()];
                for word in t
                    .split(|c: char| !c.is_alphanumeric())
                    .map(|w| w.to_lowercase())
                {
                    for (axis, words) in CONCEPTS.iter().enumerate() {
                        if words.contains(&word.as_str()) {
                            v[axis] += 1.0;
                        }
                    }
                }
                // Background component so no text embeds to zero.
                v[CONCEPTS.len()] = 0.1;
                v
            })
            .collect())
    }
}

/// Records whether two calls were ever in flight at the same time.
struct OverlapDetector {
    inner: HashProvider,
    busy: AtomicBool,
    overlapped: AtomicBool,
}

impl OverlapDetector {
    fn new() -> Self {
        Self {
            inner: HashProvider::new(64).unwrap(),
            busy: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
        }
    }
}

impl EmbeddingProvider for OverlapDetector {
    fn model_name(&self) -> &str {
        "overlap"
    }
    fn dims(&self) -> usize {
        self.inner.dims()
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(2));
        let out = self.inner.embed_batch(texts);
        self.busy.store(false, Ordering::SeqCst);
        out
    }
}

struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
    fn model_name(&self) -> &str {
        "failing"
    }
    fn dims(&self) -> usize {
        8
    }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("connection refused")
    }
}

/// Claims 8 dimensions, returns 3.
struct ShortProvider;

impl EmbeddingProvider for ShortProvider {
    fn model_name(&self) -> &str {
        "short"
    }
    fn dims(&self) -> usize {
        8
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

// ============ Fixtures ============

/// One goal, two targets, two indicators.
fn zero_hunger() -> Taxonomy {
    let goal = Goal::new(
        2,
        "Zero Hunger",
        "End hunger, achieve food security, improve nutrition and promote sustainable agriculture.",
    )
    .unwrap()
    .with_target(
        "2.1",
        "By 2030, end hunger and ensure access to safe, nutritious and sufficient food all year round.",
    )
    .unwrap()
    .with_target("2.2", "By 2030, end all forms of malnutrition.")
    .unwrap()
    .with_indicator("2.1.1", "Prevalence of undernourishment")
    .unwrap()
    .with_indicator("2.2.1", "Prevalence of stunting among children under 5")
    .unwrap();
    Taxonomy::new(vec![goal]).unwrap()
}

fn assert_laws(results: &[MatchResult], top_n: usize, threshold: f32) {
    assert!(results.len() <= top_n);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.rank, i + 1);
        assert!(r.similarity >= threshold);
    }
    for w in results.windows(2) {
        assert!(w[0].similarity >= w[1].similarity);
    }
}

// ============ Batching and call counts ============

#[test]
fn test_index_build_is_one_batched_call() {
    let provider = Arc::new(CountingProvider::new());
    let tax = Taxonomy::builtin().unwrap();

    let matcher = Matcher::new(&tax, provider.clone()).unwrap();
    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.texts.load(Ordering::SeqCst), 8);
    assert_eq!(matcher.index().len(), 8);

    matcher.find("hunger", 3, 0.0).unwrap();
    assert_eq!(provider.calls(), 2);
}

#[test]
fn test_empty_query_makes_no_provider_call() {
    let provider = Arc::new(CountingProvider::new());
    let matcher = Matcher::new(&zero_hunger(), provider.clone()).unwrap();
    let before = provider.calls();

    for q in ["", " ", "\t\n  "] {
        let err = matcher.find(q, 3, 0.0).unwrap_err();
        assert!(matches!(err, MatchError::EmptyQuery));
    }
    assert_eq!(provider.calls(), before);
}

#[test]
fn test_invalid_taxonomy_makes_no_provider_call() {
    let provider = Arc::new(CountingProvider::new());
    let bad = r#"[{"sdg_no": 2, "title": "Zero Hunger", "content": "End hunger.",
                   "indicators": [{"indicator_no": "2.1.1", "description": "   "}]}]"#;

    let err = Taxonomy::from_json_str(bad).unwrap_err();
    let err = err.downcast::<MatchError>().unwrap();
    match err {
        MatchError::Validation { path, .. } => {
            assert_eq!(path, "goals[0].indicators[0].description")
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_refresh_skips_unchanged_taxonomy() {
    let provider = Arc::new(CountingProvider::new());
    let tax = zero_hunger();
    let matcher = Matcher::new(&tax, provider.clone()).unwrap();
    assert_eq!(provider.calls(), 1);

    assert!(!matcher.refresh(&tax).unwrap());
    assert!(!matcher.refresh(&zero_hunger()).unwrap());
    assert_eq!(provider.calls(), 1);

    assert!(matcher.refresh(&Taxonomy::builtin().unwrap()).unwrap());
    assert_eq!(provider.calls(), 2);
    assert_eq!(matcher.index().len(), 8);
}

#[test]
fn test_failed_refresh_keeps_old_index() {
    let tax = zero_hunger();
    let index = CorpusIndex::build(&tax, &ConceptProvider).unwrap();
    let matcher = Matcher::with_index(index, Arc::new(FailingProvider));

    let err = matcher.refresh(&Taxonomy::builtin().unwrap()).unwrap_err();
    assert!(err.is_provider_failure());
    assert_eq!(matcher.index().len(), 5);
}

// ============ Concurrency ============

#[test]
fn test_provider_calls_never_overlap() {
    let provider = Arc::new(OverlapDetector::new());
    let matcher = Matcher::new(&zero_hunger(), provider.clone()).unwrap();
    let builtin = Taxonomy::builtin().unwrap();
    let small = zero_hunger();

    thread::scope(|scope| {
        for worker in 0..8 {
            let (matcher, builtin, small) = (&matcher, &builtin, &small);
            scope.spawn(move || {
                for round in 0..5 {
                    matcher.find("child nutrition", 3, -1.5).unwrap();
                    let tax = if (worker + round) % 2 == 0 { builtin } else { small };
                    matcher.refresh(tax).unwrap();
                }
            });
        }
    });

    assert!(!provider.overlapped.load(Ordering::SeqCst));
}

#[test]
fn test_concurrent_refresh_embeds_once() {
    let provider = Arc::new(CountingProvider::new());
    let matcher = Matcher::new(&zero_hunger(), provider.clone()).unwrap();
    let builtin = Taxonomy::builtin().unwrap();

    let (m, tax) = (&matcher, &builtin);
    let rebuilt = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(move || m.refresh(tax).unwrap()))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| *r)
            .count()
    });

    assert_eq!(rebuilt, 1);
    assert_eq!(provider.calls(), 2);
    assert_eq!(matcher.index().len(), 8);
}

// ============ Provider failures ============

#[test]
fn test_provider_error_propagates() {
    let err = Matcher::new(&zero_hunger(), Arc::new(FailingProvider))
        .err()
        .unwrap();
    assert!(matches!(err, MatchError::Provider(_)));
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_wrong_dimension_is_rejected() {
    let err = Matcher::new(&zero_hunger(), Arc::new(ShortProvider))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        MatchError::DimensionMismatch {
            expected: 8,
            actual: 3
        }
    ));
}

// ============ Ranking behavior ============

#[test]
fn test_related_indicator_outranks_goal() {
    let matcher = Matcher::new(&zero_hunger(), Arc::new(ConceptProvider)).unwrap();
    assert_eq!(matcher.index().len(), 5);

    let results = matcher.find("child malnutrition rates", 3, 0.0).unwrap();
    assert_laws(&results, 3, 0.0);
    assert!(!results.is_empty());

    let stunting = results
        .iter()
        .position(|r| r.statement.sub_indicator_id() == Some("2.2.1"))
        .expect("stunting indicator should be in the top 3");
    assert_eq!(stunting, 0);

    if let Some(goal) = results.iter().position(|r| r.statement.level() == Level::Goal) {
        assert!(stunting < goal);
    }
}

#[test]
fn test_unreachable_threshold_is_empty_not_error() {
    let matcher = Matcher::new(&zero_hunger(), Arc::new(ConceptProvider)).unwrap();
    let results = matcher.find("quantum physics seminar", 3, 0.99).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_results_are_deterministic() {
    let tax = Taxonomy::builtin().unwrap();
    let a = Matcher::new(&tax, Arc::new(HashProvider::new(256).unwrap())).unwrap();
    let b = Matcher::new(&tax, Arc::new(HashProvider::new(256).unwrap())).unwrap();

    for q in ["maternal health", "food security for children", "hunger"] {
        let ra = a.find(q, 5, -1.5).unwrap();
        let rb = b.find(q, 5, -1.5).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(a.find(q, 5, -1.5).unwrap(), ra);
    }
}

#[test]
fn test_laws_hold_across_parameters() {
    let tax = Taxonomy::builtin().unwrap();
    let matcher = Matcher::new(&tax, Arc::new(HashProvider::new(256).unwrap())).unwrap();

    for q in ["stunting", "maternal mortality ratio", "sustainable agriculture"] {
        for top_n in [1, 3, 8, 20] {
            for threshold in [-1.5, 0.0, 0.2, 0.6, 1.1] {
                let results = matcher.find(q, top_n, threshold).unwrap();
                assert_laws(&results, top_n, threshold);
            }
        }
        // Raising the threshold never adds results.
        let loose = matcher.find(q, 8, 0.0).unwrap();
        let strict = matcher.find(q, 8, 0.3).unwrap();
        assert!(strict.len() <= loose.len());
        assert_eq!(&loose[..strict.len()], &strict[..]);
    }
}

#[test]
fn test_negative_threshold_returns_everything_up_to_top_n() {
    let tax = zero_hunger();
    let index = CorpusIndex::build(&tax, &ConceptProvider).unwrap();
    let query = sdg_context::embedding::embed_query_normalized(&ConceptProvider, "hunger").unwrap();

    assert_eq!(rank::rank(&index, &query, 10, -1.5).len(), 5);
    assert_eq!(rank::rank(&index, &query, 2, -1.5).len(), 2);
}
