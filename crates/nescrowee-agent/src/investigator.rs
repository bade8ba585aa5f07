//! Investigation engine - bounded tool loop over the model
//!
//! The model drives the investigation by calling tools until it produces a
//! JSON analysis. Three budgets keep the loop finite:
//!
//! - at most `max_tool_calls` tool executions (tools stop being offered once
//!   the budget is spent)
//! - at most `max_reformat_requests` corrective prompts for unparseable answers
//! - at most `max_tool_calls + 2` model turns overall

use std::sync::Arc;

use nescrowee_chain::MessageFeed;
use nescrowee_llm::{CompletionRequest, LLMProvider, Message, ToolCall};
use nescrowee_types::{InvestigationResult, InvestigationStep, DEFAULT_CONFIDENCE};
use serde::Deserialize;
use serde_json::Value;

use crate::error::InvestigationError;
use crate::tools::{definitions, ToolExecutor};

pub const SYSTEM_PROMPT: &str = include_str!("../prompts/investigation.md");

/// Sent when the model answers with text that is not a valid analysis
pub const CORRECTIVE_PROMPT: &str = "Please produce your final analysis as JSON with: recommended_resolution, reasoning, confidence, evidence_reviewed, context_for_freelancer.";

/// Returned for tool calls the model makes after its budget is spent
const TOOL_BUDGET_EXHAUSTED: &str =
    "Tool call budget exhausted. Produce your final analysis now.";

pub const MAX_TOOL_CALLS: u32 = 12;
pub const MAX_REFORMAT_REQUESTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct InvestigatorConfig {
    pub max_tool_calls: u32,
    pub max_reformat_requests: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Publish `ai_step` records to the feed
    pub publish_steps: bool,
}

impl Default for InvestigatorConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: MAX_TOOL_CALLS,
            max_reformat_requests: MAX_REFORMAT_REQUESTS,
            temperature: 0.1,
            max_tokens: 4096,
            publish_steps: true,
        }
    }
}

impl InvestigatorConfig {
    pub fn max_turns(&self) -> u32 {
        self.max_tool_calls + 2
    }
}

/// The analysis object the model is asked to produce
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysis {
    recommended_resolution: Option<String>,
    resolution: Option<String>,
    reasoning: Option<String>,
    explanation: Option<String>,
    summary: Option<String>,
    confidence: Option<Value>,
    context_for_freelancer: Option<String>,
    evidence_reviewed: Option<Vec<Value>>,
}

/// A parsed analysis, not yet bound to a response id
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub resolution: String,
    pub explanation: String,
    pub confidence: u8,
    pub context_for_freelancer: Option<String>,
    pub evidence_reviewed: Vec<String>,
}

impl Analysis {
    pub fn into_result(self, response_id: impl Into<String>) -> InvestigationResult {
        InvestigationResult {
            resolution: self.resolution,
            explanation: self.explanation,
            confidence: self.confidence,
            context_for_freelancer: self.context_for_freelancer,
            evidence_reviewed: self.evidence_reviewed,
            response_id: response_id.into(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parse the model's final answer.
///
/// Takes the span from the first `{` to the last `}` so that prose or code
/// fences around the object are ignored. Returns `None` when there is no
/// object, it is not valid JSON, or it names no resolution.
pub fn parse_analysis(text: &str) -> Option<Analysis> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let raw: RawAnalysis = serde_json::from_str(&text[start..=end]).ok()?;
    let resolution = non_empty(raw.recommended_resolution).or(non_empty(raw.resolution))?;

    let explanation = non_empty(raw.reasoning)
        .or(non_empty(raw.explanation))
        .or(non_empty(raw.summary))
        .unwrap_or_default();

    let confidence = raw
        .confidence
        .as_ref()
        .and_then(Value::as_f64)
        .map(|c| c.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(DEFAULT_CONFIDENCE);

    let evidence_reviewed = raw
        .evidence_reviewed
        .unwrap_or_default()
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();

    Some(Analysis {
        resolution,
        explanation,
        confidence,
        context_for_freelancer: non_empty(raw.context_for_freelancer),
        evidence_reviewed,
    })
}

/// Render a tool call as `name(arg1, arg2)` for the transparency feed
pub fn render_action(call: &ToolCall) -> String {
    let args = match serde_json::from_str::<Value>(&call.arguments) {
        Ok(Value::Object(map)) => map
            .values()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => call.arguments.clone(),
    };
    format!("{}({})", call.name, args)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Runs the tool loop for one dispute
pub struct Investigator {
    llm: Arc<dyn LLMProvider>,
    tools: ToolExecutor,
    feed: Arc<dyn MessageFeed>,
    config: InvestigatorConfig,
}

impl Investigator {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        tools: ToolExecutor,
        feed: Arc<dyn MessageFeed>,
        config: InvestigatorConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            feed,
            config,
        }
    }

    pub fn config(&self) -> &InvestigatorConfig {
        &self.config
    }

    async fn post_step(&self, contract_id: &str, step: InvestigationStep) {
        if !self.config.publish_steps {
            return;
        }
        if let Err(e) = self.feed.post_step(contract_id, &step).await {
            tracing::warn!(contract_id, round = step.round, error = %e, "Failed to publish step");
        }
    }

    /// Investigate a dispute with the given model.
    ///
    /// `context` is the anonymized dispute summary read from the feed.
    pub async fn investigate(
        &self,
        model_id: &str,
        contract_id: &str,
        context: &str,
    ) -> Result<InvestigationResult, InvestigationError> {
        let mut messages = vec![Message::system(SYSTEM_PROMPT), Message::user(context)];
        let mut tool_calls_used = 0u32;
        let mut reformat_requests = 0u32;

        for turn in 0..self.config.max_turns() {
            let mut request = CompletionRequest::new(messages.clone())
                .with_model(model_id)
                .with_temperature(self.config.temperature)
                .with_max_tokens(self.config.max_tokens);
            if tool_calls_used < self.config.max_tool_calls {
                request = request.with_tools(definitions());
            }

            let response = self.llm.complete(request).await?;
            tracing::debug!(
                turn,
                response_id = %response.id,
                tool_calls = response.tool_calls.len(),
                "Model turn"
            );

            if !response.tool_calls.is_empty() {
                messages.push(Message::assistant_tool_calls(
                    response.content.clone(),
                    response.tool_calls.clone(),
                ));

                for call in &response.tool_calls {
                    if tool_calls_used >= self.config.max_tool_calls {
                        messages.push(Message::tool(&call.id, TOOL_BUDGET_EXHAUSTED));
                        continue;
                    }
                    tool_calls_used += 1;

                    let action = render_action(call);
                    tracing::info!(round = tool_calls_used, %action, "Tool call");
                    self.post_step(
                        contract_id,
                        InvestigationStep {
                            round: tool_calls_used,
                            action,
                            thought: format!("Calling {} to gather more information", call.name),
                            observation: None,
                        },
                    )
                    .await;

                    let output = self.tools.execute(contract_id, call).await;
                    messages.push(Message::tool(&call.id, output));
                }
                continue;
            }

            let Some(text) = response.text() else {
                tracing::warn!(turn, "Model returned neither tool calls nor text");
                return Err(InvestigationError::NoValidAnalysis);
            };

            if let Some(analysis) = parse_analysis(text) {
                self.post_step(
                    contract_id,
                    InvestigationStep {
                        round: tool_calls_used + 1,
                        action: "ANALYSIS".to_string(),
                        thought: format!(
                            "Final analysis: {}...",
                            truncate_chars(&analysis.explanation, 200)
                        ),
                        observation: None,
                    },
                )
                .await;

                tracing::info!(
                    resolution = %analysis.resolution,
                    confidence = analysis.confidence,
                    tool_calls = tool_calls_used,
                    "Investigation complete"
                );
                return Ok(analysis.into_result(response.id));
            }

            reformat_requests += 1;
            if reformat_requests > self.config.max_reformat_requests {
                return Err(InvestigationError::BudgetExceeded {
                    reason: format!(
                        "no parseable analysis after {} corrective prompts",
                        self.config.max_reformat_requests
                    ),
                });
            }
            tracing::debug!(reformat_requests, "Analysis not parseable, asking again");
            messages.push(Message::assistant(text));
            messages.push(Message::user(CORRECTIVE_PROMPT));
        }

        Err(InvestigationError::BudgetExceeded {
            reason: format!("no analysis within {} turns", self.config.max_turns()),
        })
    }
}
