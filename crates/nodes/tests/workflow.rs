//! End-to-end behaviour of the research workflow against in-memory providers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nodes::prompts::{RECOMMENDATIONS_SYSTEM, TOOL_ANALYSIS_SYSTEM, TOOL_EXTRACTION_SYSTEM};
use nodes::{Workflow, ANALYSIS_FAILED};
use pipeline::{
    ChatMessage, Completion, HitMetadata, LlmError, LlmProvider, OutputSchema, ProgressEvent,
    ProgressSink, ResearchState, ScrapedPage, SearchError, SearchHit, SearchProvider,
    SearchResults, ToolScoutError,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeSearch {
    results: HashMap<String, Vec<SearchHit>>,
    failing_queries: Vec<String>,
    pages: HashMap<String, String>,
    searches: Mutex<Vec<(String, usize)>>,
}

impl FakeSearch {
    fn with_hits(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.results.insert(query.to_string(), hits);
        self
    }

    fn with_page(mut self, url: &str, markdown: &str) -> Self {
        self.pages.insert(url.to_string(), markdown.to_string());
        self
    }

    fn failing(mut self, query: &str) -> Self {
        self.failing_queries.push(query.to_string());
        self
    }

    fn searches(&self) -> Vec<(String, usize)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<SearchResults, SearchError> {
        self.searches.lock().unwrap().push((query.to_string(), limit));
        if self.failing_queries.iter().any(|q| q == query) {
            return Err(SearchError::Api { status: 503 });
        }
        let data = self
            .results
            .get(query)
            .map(|hits| hits.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        Ok(SearchResults { data })
    }

    async fn scrape(&self, url: &str) -> Result<ScrapedPage, SearchError> {
        match self.pages.get(url) {
            Some(markdown) => Ok(ScrapedPage {
                markdown: Some(markdown.clone()),
            }),
            None => Err(SearchError::Unsuccessful(format!("cannot scrape {url}"))),
        }
    }
}

#[derive(Default)]
struct FakeLlm {
    extraction_answer: Option<String>,
    recommendation: Option<String>,
    analyses: HashMap<String, serde_json::Value>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeLlm {
    fn extracting(mut self, answer: &str) -> Self {
        self.extraction_answer = Some(answer.to_string());
        self
    }

    fn recommending(mut self, answer: &str) -> Self {
        self.recommendation = Some(answer.to_string());
        self
    }

    fn analysing(mut self, tool: &str, value: serde_json::Value) -> Self {
        self.analyses.insert(tool.to_string(), value);
        self
    }

    fn prompts_with_system(&self, system: &str) -> Vec<Vec<ChatMessage>> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m[0].content == system)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let answer = if messages[0].content == TOOL_EXTRACTION_SYSTEM {
            self.extraction_answer.clone()
        } else if messages[0].content == RECOMMENDATIONS_SYSTEM {
            self.recommendation.clone()
        } else {
            None
        };
        answer
            .map(|content| Completion {
                content,
                ..Completion::default()
            })
            .ok_or(LlmError::Timeout)
    }

    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        _schema: &OutputSchema,
    ) -> Result<serde_json::Value, LlmError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let user = &messages[1].content;
        let tool = user
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("Tool: "))
            .unwrap_or_default();
        self.analyses.get(tool).cloned().ok_or(LlmError::Api {
            status: 500,
            message: "no canned analysis".into(),
            retry_after: None,
        })
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressEvent>>);

impl ProgressSink for Recorder {
    fn emit(&self, event: &ProgressEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

impl Recorder {
    fn events(&self) -> Vec<ProgressEvent> {
        self.0.lock().unwrap().clone()
    }

    fn phases(&self) -> Vec<&'static str> {
        self.events().iter().map(ProgressEvent::phase).collect()
    }
}

fn hit(url: &str, title: Option<&str>, markdown: Option<&str>) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        markdown: markdown.map(str::to_string),
        description: None,
        metadata: HitMetadata {
            title: title.map(str::to_string),
        },
    }
}

fn analysis(pricing: &str, description: &str) -> serde_json::Value {
    json!({
        "pricing_model": pricing,
        "is_open_source": true,
        "tech_stack": ["Go", "React"],
        "description": description,
        "api_available": true,
        "language_support": ["Go", "Python"],
        "integration_capabilities": ["GitHub"]
    })
}

const QUERY: &str = "feature flag tools";
const ARTICLE_QUERY: &str = "feature flag tools tools comparison best alternatives";

/// Five extracted tools: Unleash and Flagsmith analyse cleanly, LaunchDarkly
/// cannot be scraped, GrowthBook has no search hit, Split is past the cap.
fn standard_fixture() -> (FakeSearch, FakeLlm) {
    let search = FakeSearch::default()
        .with_hits(
            ARTICLE_QUERY,
            vec![
                hit("https://blog.dev/a", Some("Best flags"), None),
                hit("https://blog.dev/b", Some("Flag showdown"), None),
            ],
        )
        .with_page("https://blog.dev/a", "Unleash and Flagsmith are popular.")
        .with_page("https://blog.dev/b", "LaunchDarkly leads the market.")
        .with_hits(
            "Unleash official site",
            vec![hit("https://getunleash.io", Some("Unleash"), Some("unleash snippet"))],
        )
        .with_page("https://getunleash.io", "# Unleash\nOpen source feature flags.")
        .with_hits(
            "Flagsmith official site",
            vec![hit("https://flagsmith.com", Some("Flagsmith"), Some("flagsmith snippet"))],
        )
        .with_page("https://flagsmith.com", "# Flagsmith\nFlags and remote config.")
        .with_hits(
            "LaunchDarkly official site",
            vec![hit("https://launchdarkly.com", Some("LaunchDarkly"), Some("ld snippet"))],
        )
        .with_hits(
            "Split official site",
            vec![hit("https://split.io", Some("Split"), None)],
        );

    let llm = FakeLlm::default()
        .extracting("Unleash\nFlagsmith\n\nLaunchDarkly\nGrowthBook\nSplit\n")
        .analysing("Unleash", analysis("Freemium", "Open source feature flag service."))
        .analysing("Flagsmith", analysis("Freemium", "Feature flags and remote config."))
        .recommending("Pick Unleash for self-hosting.");

    (search, llm)
}

fn workflow(search: Arc<FakeSearch>, llm: Arc<FakeLlm>) -> Workflow {
    Workflow::new(search, llm)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_run_researches_extracted_tools_in_order() {
    let (search, llm) = standard_fixture();
    let (search, llm) = (Arc::new(search), Arc::new(llm));
    let recorder = Recorder::default();

    let state = workflow(search.clone(), llm.clone())
        .run_with_progress(QUERY, &recorder)
        .await
        .unwrap();

    let extracted: Vec<&str> = state.extracted_tools.iter().map(|t| t.as_str()).collect();
    assert_eq!(
        extracted,
        vec!["Unleash", "Flagsmith", "LaunchDarkly", "GrowthBook", "Split"]
    );

    // GrowthBook has no hit, Split is beyond the four-tool cap.
    let names: Vec<&str> = state.companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Unleash", "Flagsmith", "LaunchDarkly"]);
    assert!(!search
        .searches()
        .iter()
        .any(|(q, _)| q == "Split official site"));

    let unleash = &state.companies[0];
    assert_eq!(unleash.website, "https://getunleash.io");
    assert_eq!(unleash.pricing_model.as_deref(), Some("Freemium"));
    assert_eq!(unleash.description, "Open source feature flag service.");
    assert_eq!(unleash.is_open_source, Some(true));
    assert_eq!(unleash.tech_stack, vec!["Go".to_string(), "React".to_string()]);
    assert_eq!(unleash.integration_capabilities, vec!["GitHub".to_string()]);

    assert_eq!(state.analysis, "Pick Unleash for self-hosting.");

    assert_eq!(
        recorder.phases(),
        vec![
            "extract_tools_start",
            "extracted_tools",
            "research_start",
            "research_tool_start",
            "company_ready",
            "research_tool_start",
            "company_ready",
            "research_tool_start",
            "company_ready",
            "research_tool_start",
            "research_done",
            "analysis_start",
            "analysis_done",
            "final",
        ]
    );
}

#[tokio::test]
async fn scrape_failure_keeps_record_with_sentinel_fields() {
    let (search, llm) = standard_fixture();
    let state = workflow(Arc::new(search), Arc::new(llm))
        .run(QUERY)
        .await
        .unwrap();

    let launchdarkly = state
        .companies
        .iter()
        .find(|c| c.name == "LaunchDarkly")
        .expect("record is appended even when scraping fails");
    assert_eq!(launchdarkly.website, "https://launchdarkly.com");
    assert_eq!(launchdarkly.pricing_model.as_deref(), Some("Unknown"));
    assert_eq!(launchdarkly.description, "Failed");
    assert!(launchdarkly.tech_stack.is_empty());
    assert_eq!(launchdarkly.is_open_source, None);
    assert_eq!(launchdarkly.api_available, None);
}

#[tokio::test]
async fn company_ready_events_match_final_order_and_precede_research_done() {
    let (search, llm) = standard_fixture();
    let recorder = Recorder::default();
    let state = workflow(Arc::new(search), Arc::new(llm))
        .run_with_progress(QUERY, &recorder)
        .await
        .unwrap();

    let events = recorder.events();
    let ready: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::CompanyReady { company } => Some(company.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(ready, state.companies);

    let done_at = events
        .iter()
        .position(|e| matches!(e, ProgressEvent::ResearchDone { count: 3 }))
        .unwrap();
    let last_ready = events
        .iter()
        .rposition(|e| e.phase() == "company_ready")
        .unwrap();
    assert!(last_ready < done_at);

    match events.last().unwrap() {
        ProgressEvent::Final { final_state } => assert_eq!(final_state, &state),
        other => panic!("expected final event, got {other:?}"),
    }
}

#[tokio::test]
async fn extraction_uses_three_articles_and_bounded_prefixes() {
    let long_page = "a".repeat(4000);
    let search = FakeSearch::default()
        .with_hits(
            ARTICLE_QUERY,
            vec![
                hit("https://x.dev/1", None, None),
                hit("https://x.dev/2", None, None),
                hit("https://x.dev/3", None, None),
                hit("https://x.dev/4", None, None),
            ],
        )
        .with_page("https://x.dev/1", &long_page)
        .with_page("https://x.dev/2", "second")
        .with_page("https://x.dev/4", "never read");
    let llm = FakeLlm::default().extracting("").recommending("none");
    let (search, llm) = (Arc::new(search), Arc::new(llm));

    workflow(search.clone(), llm.clone()).run(QUERY).await.unwrap();

    assert_eq!(search.searches()[0], (ARTICLE_QUERY.to_string(), 3));
    let prompts = llm.prompts_with_system(TOOL_EXTRACTION_SYSTEM);
    assert_eq!(prompts.len(), 1);
    let user = &prompts[0][1].content;
    assert!(user.contains(&format!("{}\n\nsecond\n\n", "a".repeat(1500))));
    assert!(!user.contains(&"a".repeat(1501)));
    assert!(!user.contains("never read"));
}

#[tokio::test]
async fn no_extraction_results_falls_back_to_raw_query() {
    let search = FakeSearch::default()
        .with_hits(
            QUERY,
            vec![
                hit("https://one.dev", Some("ConfigCat"), None),
                hit("https://two.dev", None, None),
                hit("https://three.dev", Some("Flipt"), None),
                hit("https://four.dev", Some("Statsig"), None),
                hit("https://five.dev", Some("Optimizely"), None),
            ],
        )
        .with_hits(
            "ConfigCat official site",
            vec![hit("https://configcat.com", Some("ConfigCat"), None)],
        )
        .with_page("https://configcat.com", "ConfigCat feature flags");
    let llm = FakeLlm::default()
        .analysing("ConfigCat", analysis("Paid", "Hosted feature flags."))
        .recommending("ConfigCat.");
    let (search, llm) = (Arc::new(search), Arc::new(llm));
    let recorder = Recorder::default();

    let state = workflow(search.clone(), llm.clone())
        .run_with_progress(QUERY, &recorder)
        .await
        .unwrap();

    assert!(state.extracted_tools.is_empty());
    // No article content, so the model is never asked to extract.
    assert!(llm.prompts_with_system(TOOL_EXTRACTION_SYSTEM).is_empty());
    assert!(search.searches().contains(&(QUERY.to_string(), 4)));

    let research_start = recorder
        .events()
        .into_iter()
        .find_map(|e| match e {
            ProgressEvent::ResearchStart { tools } => Some(tools),
            _ => None,
        })
        .unwrap();
    let titles: Vec<&str> = research_start.iter().map(|t| t.as_str()).collect();
    assert_eq!(titles, vec!["ConfigCat", "Unknown", "Flipt", "Statsig"]);

    assert_eq!(state.companies.len(), 1);
    assert_eq!(state.companies[0].description, "Hosted feature flags.");
    assert!(recorder.phases().contains(&"research_fallback"));
}

#[tokio::test]
async fn extraction_search_failure_reports_error_and_continues() {
    let search = FakeSearch::default().failing(ARTICLE_QUERY);
    let llm = FakeLlm::default().recommending("Nothing to compare.");
    let recorder = Recorder::default();

    let state = workflow(Arc::new(search), Arc::new(llm))
        .run_with_progress(QUERY, &recorder)
        .await
        .unwrap();

    assert!(state.extracted_tools.is_empty());
    assert!(state.companies.is_empty());
    assert_eq!(state.analysis, "Nothing to compare.");

    let phases = recorder.phases();
    assert_eq!(&phases[..3], &["extract_tools_start", "error", "research_fallback"]);
    assert_eq!(phases.last(), Some(&"final"));
    assert!(!phases.contains(&"extracted_tools"));
}

#[tokio::test]
async fn fallback_search_failure_yields_no_companies() {
    let search = FakeSearch::default().failing(QUERY);
    let llm = FakeLlm::default().recommending("No data.");
    let recorder = Recorder::default();

    let state = workflow(Arc::new(search), Arc::new(llm))
        .run_with_progress(QUERY, &recorder)
        .await
        .unwrap();

    assert!(state.companies.is_empty());
    let error = recorder
        .events()
        .into_iter()
        .find_map(|e| match e {
            ProgressEvent::Error { error } => Some(error),
            _ => None,
        })
        .unwrap();
    assert!(error.starts_with("research failed:"), "{error}");
    assert!(!recorder.phases().contains(&"research_done"));
    assert_eq!(state.analysis, "No data.");
}

#[tokio::test]
async fn official_site_search_failure_skips_only_that_tool() {
    let (search, llm) = standard_fixture();
    let search = search.failing("Unleash official site");
    let recorder = Recorder::default();

    let state = workflow(Arc::new(search), Arc::new(llm))
        .run_with_progress(QUERY, &recorder)
        .await
        .unwrap();

    let names: Vec<&str> = state.companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Flagsmith", "LaunchDarkly"]);

    let phases = recorder.phases();
    assert!(!phases.contains(&"error"));
    assert_eq!(phases.iter().filter(|p| **p == "research_tool_start").count(), 4);
    assert!(recorder.events().contains(&ProgressEvent::ResearchDone { count: 2 }));
    assert_eq!(phases.last(), Some(&"final"));
}

#[tokio::test]
async fn blank_description_keeps_the_rest_of_the_analysis() {
    let (search, llm) = standard_fixture();
    let llm = llm.analysing(
        "Unleash",
        json!({
            "pricing_model": "Freemium",
            "is_open_source": true,
            "tech_stack": ["Go"],
            "description": ""
        }),
    );

    let state = workflow(Arc::new(search), Arc::new(llm))
        .run(QUERY)
        .await
        .unwrap();

    let unleash = &state.companies[0];
    assert_eq!(unleash.name, "Unleash");
    assert_eq!(unleash.pricing_model.as_deref(), Some("Freemium"));
    assert_eq!(unleash.is_open_source, Some(true));
    assert_eq!(unleash.tech_stack, vec!["Go".to_string()]);
    assert_eq!(unleash.description, "");
}

#[tokio::test]
async fn invalid_structured_output_falls_back_to_sentinel() {
    let search = FakeSearch::default()
        .with_hits(ARTICLE_QUERY, vec![hit("https://blog.dev", None, None)])
        .with_page("https://blog.dev", "Try Flagd.")
        .with_hits(
            "Flagd official site",
            vec![hit("https://flagd.dev", Some("flagd"), None)],
        )
        .with_page("https://flagd.dev", "flagd is a feature flag daemon");
    let llm = FakeLlm::default()
        .extracting("Flagd")
        .analysing("Flagd", json!({ "pricing_model": "Free" }))
        .recommending("flagd.");

    let state = workflow(Arc::new(search), Arc::new(llm))
        .run(QUERY)
        .await
        .unwrap();

    assert_eq!(state.companies.len(), 1);
    assert_eq!(state.companies[0].description, "Failed");
    assert_eq!(state.companies[0].pricing_model.as_deref(), Some("Unknown"));
}

#[tokio::test]
async fn analysis_failure_sets_fallback_text() {
    let (search, mut llm) = standard_fixture();
    llm.recommendation = None;
    let llm = Arc::new(llm);
    let recorder = Recorder::default();

    let state = workflow(Arc::new(search), llm.clone())
        .run_with_progress(QUERY, &recorder)
        .await
        .unwrap();

    assert_eq!(state.analysis, ANALYSIS_FAILED);
    let phases = recorder.phases();
    assert_eq!(
        &phases[phases.len() - 3..],
        &["analysis_start", "error", "final"]
    );

    let recommendation = &llm.prompts_with_system(RECOMMENDATIONS_SYSTEM)[0][1].content;
    assert!(recommendation.contains("\"name\":\"Unleash\""));
    assert!(recommendation.contains(QUERY));
    assert_eq!(llm.prompts_with_system(TOOL_ANALYSIS_SYSTEM).len(), 2);
}

#[tokio::test]
async fn blank_query_fails_before_any_stage() {
    let search = Arc::new(FakeSearch::default());
    let recorder = Recorder::default();

    let err = workflow(search.clone(), Arc::new(FakeLlm::default()))
        .run_with_progress("   ", &recorder)
        .await
        .unwrap_err();

    assert!(matches!(err, ToolScoutError::EmptyQuery));
    assert_eq!(recorder.phases(), vec!["error"]);
    assert!(search.searches().is_empty());
}

#[tokio::test]
async fn identical_inputs_give_identical_runs() {
    let (search, llm) = standard_fixture();
    let flow = workflow(Arc::new(search), Arc::new(llm));

    let first = Recorder::default();
    let second = Recorder::default();
    let a: ResearchState = flow.run_with_progress(QUERY, &first).await.unwrap();
    let b: ResearchState = flow.run_with_progress(QUERY, &second).await.unwrap();

    assert_eq!(a, b);
    assert_eq!(first.events(), second.events());
}

#[tokio::test]
async fn concurrent_runs_keep_their_own_event_streams() {
    let (search, llm) = standard_fixture();
    let flow = workflow(Arc::new(search), Arc::new(llm));

    let first = Recorder::default();
    let second = Recorder::default();
    let (a, b) = tokio::join!(
        flow.run_with_progress(QUERY, &first),
        flow.run_with_progress("   ", &second),
    );

    assert!(a.is_ok());
    assert!(b.is_err());
    assert_eq!(first.phases().last(), Some(&"final"));
    assert_eq!(second.phases(), vec!["error"]);
}
