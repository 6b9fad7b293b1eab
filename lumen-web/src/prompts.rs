//! Prompt catalogue for the stateless generation endpoints.
//!
//! Each endpoint deserializes a small input struct, validates it into a
//! [`PromptKind`], and sends the rendered template without conversation
//! context. The set of kinds and quick actions is closed: an unknown
//! `action` fails deserialization instead of falling back to a default.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};

const DEFAULT_QUOTE_CATEGORY: &str = "inspiration";
const DEFAULT_IDEA_TOPIC: &str = "a weekend software project";
const DEFAULT_DESIGN_STYLE: &str = "modern and minimal";

/// Text transformations offered by `/quick_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Translate,
    Simplify,
    Expand,
    FixGrammar,
    BulletPoints,
    Tweet,
}

impl QuickAction {
    /// Instruction placed before the user's text.
    pub fn instruction(self) -> &'static str {
        match self {
            QuickAction::Translate => {
                "Translate the following text into English. If it is already English, translate it into Spanish. Return only the translation."
            }
            QuickAction::Simplify => {
                "Rewrite the following text in plain language that a twelve-year-old could follow. Keep the meaning intact."
            }
            QuickAction::Expand => {
                "Expand the following text with more detail, examples, and context while keeping its tone."
            }
            QuickAction::FixGrammar => {
                "Fix spelling, grammar, and punctuation in the following text. Return only the corrected text."
            }
            QuickAction::BulletPoints => {
                "Turn the following text into a concise markdown bullet list of its key points."
            }
            QuickAction::Tweet => {
                "Rewrite the following text as a single engaging tweet under 280 characters."
            }
        }
    }
}

/// A validated stateless request.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptKind {
    Quote {
        category: String,
    },
    Summarize {
        text: String,
    },
    ExplainCode {
        code: String,
        language: Option<String>,
    },
    GenerateIdea {
        topic: String,
    },
    QuickAction {
        action: QuickAction,
        text: String,
    },
    GenerateReadme {
        project_name: String,
        description: String,
        features: Vec<String>,
    },
    AddComments {
        code: String,
        language: Option<String>,
    },
    DesignSystem {
        description: String,
        style: String,
    },
}

impl PromptKind {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            PromptKind::Quote { .. } => "quote",
            PromptKind::Summarize { .. } => "summarize",
            PromptKind::ExplainCode { .. } => "explain_code",
            PromptKind::GenerateIdea { .. } => "generate_idea",
            PromptKind::QuickAction { .. } => "quick_action",
            PromptKind::GenerateReadme { .. } => "generate_readme",
            PromptKind::AddComments { .. } => "add_comments",
            PromptKind::DesignSystem { .. } => "design_system",
        }
    }

    /// JSON field the reply is returned under.
    pub fn response_field(&self) -> &'static str {
        match self {
            PromptKind::Quote { .. } => "quote",
            PromptKind::Summarize { .. } => "summary",
            PromptKind::ExplainCode { .. } => "explanation",
            PromptKind::GenerateIdea { .. } => "idea",
            PromptKind::QuickAction { .. } => "result",
            PromptKind::GenerateReadme { .. } => "readme",
            PromptKind::AddComments { .. } => "commented_code",
            PromptKind::DesignSystem { .. } => "design_system",
        }
    }

    /// Render the prompt sent to the model.
    pub fn render(&self) -> String {
        match self {
            PromptKind::Quote { category } => format!(
                "Write one short, original quote about {category}. \
                 Reply with the quote only, followed by a dash and a fitting attribution."
            ),
            PromptKind::Summarize { text } => format!(
                "Summarize the following text in a few clear sentences. \
                 Keep the key facts and drop filler.\n\n{text}"
            ),
            PromptKind::ExplainCode { code, language } => format!(
                "Explain what the following {} code does, step by step, for a developer \
                 who is new to it. Point out anything surprising.\n\n```{}\n{code}\n```",
                language.as_deref().unwrap_or("source"),
                language.as_deref().unwrap_or(""),
            ),
            PromptKind::GenerateIdea { topic } => format!(
                "Suggest one creative, achievable project idea about {topic}. \
                 Give it a name, a one-paragraph pitch, a list of core features, \
                 and a suggested tech stack."
            ),
            PromptKind::QuickAction { action, text } => {
                format!("{}\n\n{text}", action.instruction())
            }
            PromptKind::GenerateReadme {
                project_name,
                description,
                features,
            } => {
                let mut prompt = format!(
                    "Write a complete README.md in markdown for a project named \"{project_name}\".\n\
                     Description: {description}\n"
                );
                if !features.is_empty() {
                    prompt.push_str("Features:\n");
                    for feature in features {
                        prompt.push_str(&format!("- {feature}\n"));
                    }
                }
                prompt.push_str(
                    "Include a title, overview, features, installation, usage, \
                     contributing, and license sections.",
                );
                prompt
            }
            PromptKind::AddComments { code, language } => format!(
                "Add clear, concise comments to the following {} code. \
                 Do not change the code itself. Return only the commented code.\n\n```{}\n{code}\n```",
                language.as_deref().unwrap_or("source"),
                language.as_deref().unwrap_or(""),
            ),
            PromptKind::DesignSystem { description, style } => format!(
                "Create a design system for: {description}\n\
                 Style: {style}\n\
                 Include a colour palette with hex codes, typography scale, spacing scale, \
                 border radii, and guidance for buttons, inputs, and cards."
            ),
        }
    }
}

/// Input struct of a stateless endpoint.
pub trait PromptInput {
    /// Validate and convert into a prompt.
    fn into_prompt(self) -> Result<PromptKind, ApiError>;
}

/// Require a non-blank text field.
fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::InvalidInput(format!("'{field}' is required"))),
    }
}

/// Use the value unless it is absent or blank.
fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub category: Option<String>,
}

impl PromptInput for QuoteRequest {
    fn into_prompt(self) -> Result<PromptKind, ApiError> {
        Ok(PromptKind::Quote {
            category: or_default(self.category, DEFAULT_QUOTE_CATEGORY),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub text: Option<String>,
}

impl PromptInput for SummarizeRequest {
    fn into_prompt(self) -> Result<PromptKind, ApiError> {
        Ok(PromptKind::Summarize {
            text: required("text", self.text)?,
        })
    }
}

/// Shared by `/explain_code` and `/add_comments`.
#[derive(Debug, Default, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct ExplainCodeRequest(pub CodeRequest);

impl PromptInput for ExplainCodeRequest {
    fn into_prompt(self) -> Result<PromptKind, ApiError> {
        Ok(PromptKind::ExplainCode {
            code: required("code", self.0.code)?,
            language: non_blank(self.0.language),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct AddCommentsRequest(pub CodeRequest);

impl PromptInput for AddCommentsRequest {
    fn into_prompt(self) -> Result<PromptKind, ApiError> {
        Ok(PromptKind::AddComments {
            code: required("code", self.0.code)?,
            language: non_blank(self.0.language),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateIdeaRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

impl PromptInput for GenerateIdeaRequest {
    fn into_prompt(self) -> Result<PromptKind, ApiError> {
        Ok(PromptKind::GenerateIdea {
            topic: or_default(self.topic, DEFAULT_IDEA_TOPIC),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct QuickActionRequest {
    #[serde(default)]
    pub action: Option<QuickAction>,
    #[serde(default)]
    pub text: Option<String>,
}

impl PromptInput for QuickActionRequest {
    fn into_prompt(self) -> Result<PromptKind, ApiError> {
        let action = self
            .action
            .ok_or_else(|| ApiError::InvalidInput("'action' is required".into()))?;
        Ok(PromptKind::QuickAction {
            action,
            text: required("text", self.text)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateReadmeRequest {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl PromptInput for GenerateReadmeRequest {
    fn into_prompt(self) -> Result<PromptKind, ApiError> {
        Ok(PromptKind::GenerateReadme {
            project_name: required("project_name", self.project_name)?,
            description: required("description", self.description)?,
            features: self
                .features
                .into_iter()
                .filter(|f| !f.trim().is_empty())
                .collect(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DesignSystemRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

impl PromptInput for DesignSystemRequest {
    fn into_prompt(self) -> Result<PromptKind, ApiError> {
        Ok(PromptKind::DesignSystem {
            description: required("description", self.description)?,
            style: or_default(self.style, DEFAULT_DESIGN_STYLE),
        })
    }
}
