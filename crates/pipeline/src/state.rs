//! Research state and the records it accumulates.
//!
//! A [`ResearchState`] is created once per run with only the query set. Each
//! stage returns a [`StateUpdate`] which the driver merges in; fields a stage
//! does not touch are carried through unchanged.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::llm::{OutputSchema, SchemaViolation, StructuredOutput};
use crate::{ToolName, ToolScoutError};

// ---------------------------------------------------------------------------
// Research state
// ---------------------------------------------------------------------------

/// The single state object threaded through every stage of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    query: String,

    /// Candidate tool names produced by the extraction stage. May be empty.
    #[serde(default)]
    pub extracted_tools: Vec<ToolName>,

    /// One record per researched tool, in research order.
    #[serde(default)]
    pub companies: Vec<Company>,

    /// Free-text recommendation produced by the final stage.
    #[serde(default)]
    pub analysis: String,
}

impl ResearchState {
    /// Creates the initial state for a run.
    ///
    /// # Errors
    ///
    /// Returns [`ToolScoutError::EmptyQuery`] if `query` is blank.
    pub fn new(query: impl Into<String>) -> Result<Self, ToolScoutError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ToolScoutError::EmptyQuery);
        }
        Ok(Self {
            query,
            extracted_tools: Vec::new(),
            companies: Vec::new(),
            analysis: String::new(),
        })
    }

    /// The query this run was created with.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Merges a stage's partial update into the state.
    ///
    /// Fields left as `None` in the update are not touched.
    pub fn merge(&mut self, update: StateUpdate) {
        let StateUpdate {
            extracted_tools,
            companies,
            analysis,
        } = update;
        if let Some(tools) = extracted_tools {
            self.extracted_tools = tools;
        }
        if let Some(companies) = companies {
            self.companies = companies;
        }
        if let Some(analysis) = analysis {
            self.analysis = analysis;
        }
    }
}

/// Partial update returned by a stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    /// Replaces [`ResearchState::extracted_tools`] when set.
    pub extracted_tools: Option<Vec<ToolName>>,
    /// Replaces [`ResearchState::companies`] when set.
    pub companies: Option<Vec<Company>>,
    /// Replaces [`ResearchState::analysis`] when set.
    pub analysis: Option<String>,
}

impl StateUpdate {
    /// An update that sets only the extracted tool names.
    pub fn extracted_tools(tools: Vec<ToolName>) -> Self {
        Self {
            extracted_tools: Some(tools),
            ..Self::default()
        }
    }

    /// An update that sets only the company records.
    pub fn companies(companies: Vec<Company>) -> Self {
        Self {
            companies: Some(companies),
            ..Self::default()
        }
    }

    /// An update that sets only the recommendation text.
    pub fn analysis(analysis: impl Into<String>) -> Self {
        Self {
            analysis: Some(analysis.into()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Company record
// ---------------------------------------------------------------------------

/// Structured description of one researched tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    /// Tool name as extracted or taken from a search title.
    pub name: String,
    /// One-line summary; a search snippet until analysis overwrites it.
    #[serde(default)]
    pub description: String,
    /// Homepage URL, or empty when the search result carried none.
    #[serde(default)]
    pub website: String,
    /// Free, Freemium, Paid, Enterprise or Unknown. `None` before analysis.
    #[serde(default)]
    pub pricing_model: Option<String>,
    /// `None` when the page did not say.
    #[serde(default)]
    pub is_open_source: Option<bool>,
    /// Technologies the tool is built with or runs on.
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Whether a public API or SDK is offered. `None` when unclear.
    #[serde(default)]
    pub api_available: Option<bool>,
    /// Programming languages with client support.
    #[serde(default)]
    pub language_support: Vec<String>,
    /// Platforms and services the tool integrates with.
    #[serde(default)]
    pub integration_capabilities: Vec<String>,
    /// Not filled in by the workflow.
    #[serde(default)]
    pub competitors: Vec<String>,
}

impl Company {
    /// Seeds a record from a tool name, a placeholder description and a URL.
    pub fn seed(name: &ToolName, description: impl Into<String>, website: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.into(),
            website: website.into(),
            ..Self::default()
        }
    }

    /// Overwrites the analysed attributes with `analysis`.
    ///
    /// `name`, `website` and `competitors` are not part of the analysis and are
    /// left as they are.
    pub fn apply_analysis(&mut self, analysis: CompanyAnalysis) {
        self.pricing_model = Some(analysis.pricing_model);
        self.is_open_source = analysis.is_open_source;
        self.tech_stack = analysis.tech_stack;
        self.description = analysis.description;
        self.api_available = analysis.api_available;
        self.language_support = analysis.language_support;
        self.integration_capabilities = analysis.integration_capabilities;
    }
}

// ---------------------------------------------------------------------------
// Analysis record
// ---------------------------------------------------------------------------

/// Attributes extracted from a tool's web page by a structured LLM call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAnalysis {
    pub pricing_model: String,
    #[serde(default)]
    pub is_open_source: Option<bool>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub api_available: Option<bool>,
    #[serde(default)]
    pub language_support: Vec<String>,
    #[serde(default)]
    pub integration_capabilities: Vec<String>,
}

impl CompanyAnalysis {
    /// Pricing model reported when nothing better is known.
    pub const UNKNOWN_PRICING: &'static str = "Unknown";

    /// Description recorded when analysis could not be performed.
    pub const FAILED_DESCRIPTION: &'static str = "Failed";

    /// The sentinel substituted whenever analysis fails.
    pub fn failed() -> Self {
        Self {
            pricing_model: Self::UNKNOWN_PRICING.to_string(),
            is_open_source: None,
            tech_stack: Vec::new(),
            description: Self::FAILED_DESCRIPTION.to_string(),
            api_available: None,
            language_support: Vec::new(),
            integration_capabilities: Vec::new(),
        }
    }
}

impl StructuredOutput for CompanyAnalysis {
    fn schema() -> OutputSchema {
        let string_list = json!({ "type": "array", "items": { "type": "string" } });
        OutputSchema::new(
            "CompanyAnalysis",
            "Developer-focused attributes of a tool extracted from its website.",
            json!({
                "type": "object",
                "properties": {
                    "pricing_model": {
                        "type": "string",
                        "description": "One of Free, Freemium, Paid, Enterprise, or Unknown"
                    },
                    "is_open_source": {
                        "type": ["boolean", "null"],
                        "description": "true if open source, false if proprietary, null if unclear"
                    },
                    "tech_stack": string_list,
                    "description": {
                        "type": "string",
                        "description": "One sentence on what the tool does for developers"
                    },
                    "api_available": {
                        "type": ["boolean", "null"],
                        "description": "true if a REST/GraphQL API or SDK is offered"
                    },
                    "language_support": string_list,
                    "integration_capabilities": string_list
                },
                "required": ["pricing_model", "description"]
            }),
        )
    }

    /// Blank strings are kept as answers rather than rejected: a blank
    /// pricing model reads as [`CompanyAnalysis::UNKNOWN_PRICING`] and a blank
    /// description stays blank.
    fn validate(mut self) -> Result<Self, SchemaViolation> {
        self.pricing_model = self.pricing_model.trim().to_string();
        if self.pricing_model.is_empty() {
            self.pricing_model = Self::UNKNOWN_PRICING.to_string();
        }
        self.description = self.description.trim().to_string();
        self.tech_stack = normalise_list(self.tech_stack);
        self.language_support = normalise_list(self.language_support);
        self.integration_capabilities = normalise_list(self.integration_capabilities);
        Ok(self)
    }
}

/// Trims entries, drops blanks and removes duplicates, keeping first-seen order.
fn normalise_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if item.is_empty() || out.iter().any(|seen| seen == item) {
            continue;
        }
        out.push(item.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> ToolName {
        ToolName::new(name).unwrap()
    }

    #[test]
    fn new_state_rejects_blank_query() {
        assert!(matches!(ResearchState::new("  "), Err(ToolScoutError::EmptyQuery)));
    }

    #[test]
    fn merge_only_touches_fields_present_in_update() {
        let mut state = ResearchState::new("feature flag tools").unwrap();
        state.merge(StateUpdate::extracted_tools(vec![tool("Unleash")]));
        state.merge(StateUpdate::analysis("Use Unleash."));

        assert_eq!(state.query(), "feature flag tools");
        assert_eq!(state.extracted_tools, vec![tool("Unleash")]);
        assert!(state.companies.is_empty());
        assert_eq!(state.analysis, "Use Unleash.");
    }

    #[test]
    fn apply_analysis_keeps_identity_fields() {
        let mut company = Company::seed(&tool("Flagsmith"), "snippet", "https://flagsmith.com");
        company.competitors = vec!["Unleash".into()];
        company.apply_analysis(CompanyAnalysis::failed());

        assert_eq!(company.name, "Flagsmith");
        assert_eq!(company.website, "https://flagsmith.com");
        assert_eq!(company.competitors, vec!["Unleash".to_string()]);
        assert_eq!(company.pricing_model.as_deref(), Some("Unknown"));
        assert_eq!(company.description, "Failed");
        assert!(company.tech_stack.is_empty());
        assert_eq!(company.is_open_source, None);
    }

    #[test]
    fn validate_normalises_lists() {
        let analysis = CompanyAnalysis {
            pricing_model: " Freemium ".into(),
            is_open_source: Some(true),
            tech_stack: vec!["Go".into(), " Go".into(), "".into(), "React".into()],
            description: "Feature flags.".into(),
            api_available: Some(true),
            language_support: vec!["Python".into(), "Python".into()],
            integration_capabilities: vec![],
        }
        .validate()
        .unwrap();

        assert_eq!(analysis.pricing_model, "Freemium");
        assert_eq!(analysis.tech_stack, vec!["Go".to_string(), "React".to_string()]);
        assert_eq!(analysis.language_support, vec!["Python".to_string()]);
    }

    #[test]
    fn validate_keeps_analysis_with_blank_description() {
        let analysis = CompanyAnalysis {
            pricing_model: "Freemium".into(),
            is_open_source: Some(true),
            tech_stack: vec!["Go".into()],
            description: "  ".into(),
            api_available: None,
            language_support: vec![],
            integration_capabilities: vec![],
        }
        .validate()
        .unwrap();

        assert_eq!(analysis.description, "");
        assert_eq!(analysis.pricing_model, "Freemium");
        assert_eq!(analysis.is_open_source, Some(true));
        assert_eq!(analysis.tech_stack, vec!["Go".to_string()]);
    }

    #[test]
    fn validate_reads_blank_pricing_as_unknown() {
        let mut analysis = CompanyAnalysis::failed();
        analysis.pricing_model = " ".into();
        analysis.description = "A CLI.".into();
        let analysis = analysis.validate().unwrap();
        assert_eq!(analysis.pricing_model, CompanyAnalysis::UNKNOWN_PRICING);
        assert_eq!(analysis.description, "A CLI.");
    }

    #[test]
    fn company_serialises_tri_state_as_null() {
        let company = Company::seed(&tool("GrowthBook"), "", "");
        let value = serde_json::to_value(&company).unwrap();
        assert_eq!(value["is_open_source"], serde_json::Value::Null);
        assert_eq!(value["tech_stack"], json!([]));
    }
}
