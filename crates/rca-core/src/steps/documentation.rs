use reasoning_agent::{
    complete, Completion, CompletionRequest, GroundingChunk, GroundingMetadata, GroundingSource,
    Turn,
};

use crate::agent_loop::StepContext;
use crate::error::Result;
use crate::state::{Document, ExternalSearchResult, InternalSearchResult, WorkflowState};

/// Resource locator prefix for documents from the internal index.
pub const INTERNAL_DOC_URL_PREFIX: &str = "https://discoveryengine.googleapis.com/v1/";

pub const EXTERNAL_NOT_FOUND: &str =
    "External search haven't found any documents or the search failed.";
pub const INTERNAL_NOT_FOUND: &str =
    "Internal search haven't found any documents or the search failed.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocSource {
    /// Public pages fetched by URL.
    External { sites: Vec<String> },
    /// A managed internal document index.
    Internal { datastore_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocOutcome {
    Grounded {
        text: String,
        references: Vec<Document>,
    },
    /// Nothing grounded came back; carries the fixed operator message.
    NotFound(&'static str),
}

impl DocOutcome {
    pub fn message(&self) -> &str {
        match self {
            DocOutcome::Grounded { text, .. } => text.as_str(),
            DocOutcome::NotFound(msg) => msg,
        }
    }
}

/// Map grounding chunks to `{url, title}` references in chunk order.
pub fn normalize_references(grounding: &GroundingMetadata) -> Vec<Document> {
    grounding
        .grounding_chunks
        .iter()
        .map(|chunk| match chunk {
            GroundingChunk::Web { uri, title } => Document {
                url: uri.clone(),
                title: title.clone(),
            },
            GroundingChunk::RetrievedContext {
                document_name,
                text,
            } => Document {
                url: format!("{INTERNAL_DOC_URL_PREFIX}{document_name}"),
                title: text.clone(),
            },
        })
        .collect()
}

/// One retrieval pass over a documentation source, accepted only when the
/// final response is grounded on at least one chunk.
#[derive(Debug, Clone)]
pub struct DocumentationRetriever {
    source: DocSource,
}

impl DocumentationRetriever {
    pub fn external(sites: Vec<String>) -> Self {
        Self {
            source: DocSource::External { sites },
        }
    }

    pub fn internal(datastore_id: impl Into<String>) -> Self {
        Self {
            source: DocSource::Internal {
                datastore_id: datastore_id.into(),
            },
        }
    }

    pub fn source(&self) -> &DocSource {
        &self.source
    }

    fn not_found(&self) -> DocOutcome {
        match self.source {
            DocSource::External { .. } => DocOutcome::NotFound(EXTERNAL_NOT_FOUND),
            DocSource::Internal { .. } => DocOutcome::NotFound(INTERNAL_NOT_FOUND),
        }
    }

    fn is_configured(&self) -> bool {
        match &self.source {
            DocSource::External { sites } => !sites.is_empty(),
            DocSource::Internal { datastore_id } => !datastore_id.is_empty(),
        }
    }

    fn request(&self, ctx: &StepContext<'_>, incident: &str) -> CompletionRequest {
        let (instructions, grounding) = match &self.source {
            DocSource::External { sites } => (
                format!(
                    "If you cannot access the URLs then respond with a message that the external search is misconfigured.\n\n\
                     Identify the root causes and potential remedies related to this incident:\n\n{incident}\n\
                     Only use these URLs to get the possible root causes of the problem:\n{}",
                    sites.join("\n")
                ),
                GroundingSource::Web {
                    urls: sites.clone(),
                },
            ),
            DocSource::Internal { datastore_id } => (
                format!(
                    "Retrieve the causes and suggested actions related to the incident:\n{incident}\n\
                     Only use the results returned by the search and nothing else. \
                     If the search doesn't return any results just state that in the final response."
                ),
                GroundingSource::Datastore {
                    id: datastore_id.clone(),
                },
            ),
        };
        CompletionRequest {
            model: ctx.model.to_string(),
            instructions,
            turns: vec![Turn::User {
                text: "Retrieve the documentation for this incident.".into(),
            }],
            tools: Vec::new(),
            grounding: Some(grounding),
            include_thoughts: ctx.include_thoughts,
        }
    }

    /// Writes the grounding and result slots for this source only when the
    /// response is grounded.
    pub async fn retrieve(
        &self,
        ctx: &StepContext<'_>,
        state: &mut WorkflowState,
    ) -> Result<DocOutcome> {
        let incident = state.incident()?.summary();
        if !self.is_configured() {
            tracing::warn!(source = ?self.source, "documentation source is not configured");
            return Ok(self.not_found());
        }
        let completion = complete(ctx.reasoner, self.request(ctx, &incident)).await?;
        Ok(self.accept(completion, state))
    }

    fn accept(&self, completion: Completion, state: &mut WorkflowState) -> DocOutcome {
        let grounding = match completion.grounding {
            Some(g) if !g.grounding_chunks.is_empty() => g,
            _ => {
                tracing::warn!(source = ?self.source, "documentation search was not grounded");
                return self.not_found();
            }
        };
        let references = normalize_references(&grounding);
        let text = completion.text;
        match self.source {
            DocSource::External { .. } => {
                state.external_grounding = Some(grounding);
                state.external_search = Some(ExternalSearchResult {
                    search_results: text.clone(),
                    references: references.clone(),
                });
            }
            DocSource::Internal { .. } => {
                state.internal_search = Some(InternalSearchResult {
                    queries: grounding.retrieval_queries.clone(),
                    search_result: text.clone(),
                    references: references.clone(),
                });
                state.internal_grounding = Some(grounding);
            }
        }
        tracing::info!(references = references.len(), "documentation retrieved");
        DocOutcome::Grounded { text, references }
    }
}
