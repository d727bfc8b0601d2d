use async_trait::async_trait;
use bookbot_service::{
    FamiliarityLevel, GenerationError, Genre, Language, ModelClient, ModelInvoker, Orchestrator,
    Preferences,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Replays canned responses in order, repeating the last one; counts calls.
struct StubModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicU32,
}

impl StubModel {
    fn always(response: Result<&str, &str>) -> Arc<Self> {
        Self::sequence(vec![response])
    }

    fn sequence(responses: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for StubModel {
    async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        let next = if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        };
        next.map_err(|e| anyhow::anyhow!(e))
    }
}

const FOUR_CANDIDATES: &str = r#"```json
{
  "recommendations": [
    {"title": "Book W", "author": "Author W", "publication_year": 1954, "explanation": "An epic quest across a vast world."},
    {"title": "book c", "author": "Author C", "publication_year": 1990, "explanation": "Court intrigue with a dash of magic."},
    {"title": "Book X", "author": "Author X", "publication_year": 2011, "explanation": "A clever heist in a city of illusions."},
    {"title": "Book Y", "author": "Author Y", "publication_year": "2015", "explanation": "Found family and dragons, what more?"}
  ]
}
```"#;

fn preferences() -> Preferences {
    Preferences::new(
        vec![Genre::Fantasy],
        vec!["Book A".to_string(), "Book B".to_string()],
        FamiliarityLevel::new(3).unwrap(),
    )
    .unwrap()
}

fn titles(result: &[bookbot_service::Recommendation]) -> Vec<&str> {
    result.iter().map(|r| r.title.as_str()).collect()
}

#[tokio::test]
async fn returns_all_valid_candidates_in_order() {
    let model = StubModel::always(Ok(FOUR_CANDIDATES));
    let orchestrator = Orchestrator::new(ModelInvoker::new(model.clone()));

    let result = orchestrator
        .generate(&preferences(), &[], Language::En)
        .await
        .unwrap();

    assert_eq!(titles(&result), ["Book W", "book c", "Book X", "Book Y"]);
    assert_eq!(result[3].publication_year, 2015);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn excluded_title_is_removed_regardless_of_case() {
    let model = StubModel::always(Ok(FOUR_CANDIDATES));
    let orchestrator = Orchestrator::new(ModelInvoker::new(model.clone()));

    let result = orchestrator
        .generate(&preferences(), &["Book C".to_string()], Language::En)
        .await
        .unwrap();

    assert_eq!(titles(&result), ["Book W", "Book X", "Book Y"]);
}

#[tokio::test]
async fn unparseable_output_exhausts_after_exactly_three_attempts() {
    let model = StubModel::always(Ok("I'm sorry, I can't help with that."));
    let orchestrator = Orchestrator::new(ModelInvoker::new(model.clone()));

    let err = orchestrator
        .generate(&preferences(), &[], Language::En)
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::Exhausted { attempts: 3 });
    assert_eq!(model.calls(), 3);
}

#[tokio::test]
async fn transport_failures_are_retried_inside_each_attempt() {
    let model = StubModel::always(Err("503 from provider"));
    let orchestrator = Orchestrator::new(ModelInvoker::new(model.clone()));

    let err = orchestrator
        .generate(&preferences(), &[], Language::Zh)
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::Exhausted { attempts: 3 });
    assert_eq!(model.calls(), 9);
}

#[tokio::test]
async fn later_attempt_can_succeed() {
    let model = StubModel::sequence(vec![
        Ok(r#"{"recommendations": [{"title": "Only One", "author": "A", "publication_year": 2000, "explanation": "Not enough on its own."}]}"#),
        Ok(FOUR_CANDIDATES),
    ]);
    let orchestrator = Orchestrator::new(ModelInvoker::new(model.clone()));

    let result = orchestrator
        .generate(&preferences(), &[], Language::En)
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn attempt_budget_is_configurable() {
    let model = StubModel::always(Ok("{}"));
    let orchestrator = Orchestrator::with_max_attempts(ModelInvoker::new(model.clone()), 5);

    let err = orchestrator
        .generate(&preferences(), &[], Language::En)
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::Exhausted { attempts: 5 });
    assert_eq!(model.calls(), 5);
}

#[tokio::test]
async fn concurrent_runs_do_not_share_state() {
    let model = StubModel::always(Ok(FOUR_CANDIDATES));
    let orchestrator = Orchestrator::new(ModelInvoker::new(model.clone()));
    let prefs = preferences();
    let exclusion = vec!["Book W".to_string()];

    let (with_exclusion, without) = tokio::join!(
        orchestrator.generate(&prefs, &exclusion, Language::En),
        orchestrator.generate(&prefs, &[], Language::En),
    );

    assert_eq!(with_exclusion.unwrap().len(), 3);
    assert_eq!(without.unwrap().len(), 4);
}

#[tokio::test]
async fn exclusion_leaving_fewer_than_three_fails_the_attempt() {
    let model = StubModel::always(Ok(FOUR_CANDIDATES));
    let orchestrator = Orchestrator::new(ModelInvoker::new(model.clone()));
    let exclusion = vec!["Book W".to_string(), "BOOK X".to_string()];

    let err = orchestrator
        .generate(&preferences(), &exclusion, Language::En)
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::Exhausted { attempts: 3 });
    assert_eq!(model.calls(), 3);
}
