//! Ticket classification: taxonomy, prompt construction, and response
//! parsing, plus the retry-protected gateway in front of the model API.

pub mod gateway;
pub mod gemini;
pub mod retry;

pub use gateway::{ClassificationClient, ClassifierGateway, ClassifyError};
pub use gemini::GeminiClient;
pub use retry::RetryPolicy;

use serde::{Deserialize, Serialize};

/// Product area a ticket is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductArea {
    Casb,
    Swg,
    Ztna,
    Other,
}

impl ProductArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductArea::Casb => "CASB",
            ProductArea::Swg => "SWG",
            ProductArea::Ztna => "ZTNA",
            ProductArea::Other => "OTHER",
        }
    }

    /// Coerce a model-provided label into the taxonomy. Anything outside it
    /// (including empty input) maps to [`ProductArea::Other`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "CASB" => ProductArea::Casb,
            "SWG" => ProductArea::Swg,
            "ZTNA" => ProductArea::Ztna,
            _ => ProductArea::Other,
        }
    }
}

/// Ticket urgency, P0 (most severe) through P3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    P0,
    P1,
    P2,
    P3,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::P0 => "P0",
            Urgency::P1 => "P1",
            Urgency::P2 => "P2",
            Urgency::P3 => "P3",
        }
    }

    /// Coerce a model-provided label into the taxonomy, defaulting to the
    /// middle priority [`Urgency::P2`] for anything unrecognized.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "P0" => Urgency::P0,
            "P1" => Urgency::P1,
            "P2" => Urgency::P2,
            "P3" => Urgency::P3,
            _ => Urgency::P2,
        }
    }
}

/// Classification produced for one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub product_area: ProductArea,
    pub urgency: Urgency,
    pub reason: String,
    /// Model that produced (or fell back for) this classification.
    pub model: String,
}

impl ClassificationResult {
    /// The classification used when the model replied but its payload could
    /// not be parsed as a classification.
    pub fn fallback(model: &str) -> Self {
        Self {
            product_area: ProductArea::Other,
            urgency: Urgency::P2,
            reason: "fallback: invalid JSON".to_string(),
            model: model.to_string(),
        }
    }
}

/// Outcome of parsing a raw model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Ok,
    ParseError,
}

/// Build the classification prompt for `ticket_text`.
pub fn build_prompt(ticket_text: &str) -> String {
    format!(
        r#"You are a support ticket classifier.

Classify the following ticket into:
- product_area: one of [CASB, SWG, ZTNA, OTHER]
- urgency: one of [P0, P1, P2, P3]

Definitions:
P0: Service down, security incident, customer blocked
P1: Major functionality broken, workaround exists
P2: Partial issue, degraded experience
P3: How-to, informational, documentation request

Ticket:
"{ticket_text}"

Respond ONLY in valid JSON:
{{
  "product_area": "...",
  "urgency": "...",
  "reason": "short explanation"
}}
"#
    )
}

/// Rough token estimate at ~4 characters per token, never less than 1.
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(4).max(1)
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    product_area: Option<serde_json::Value>,
    urgency: Option<serde_json::Value>,
    reason: Option<serde_json::Value>,
}

fn value_to_label(value: Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Parse a raw model reply into a classification.
///
/// A reply that is not valid JSON (or not an object) yields the safe
/// fallback rather than an error; out-of-taxonomy labels are coerced to
/// OTHER / P2 individually.
pub fn parse_classification(raw: &str, model: &str) -> (ClassificationResult, ParseStatus) {
    let parsed: Result<RawClassification, _> = serde_json::from_str(raw);
    match parsed {
        Ok(raw) => {
            let product_area = ProductArea::from_label(&value_to_label(raw.product_area));
            let urgency = Urgency::from_label(&value_to_label(raw.urgency));
            let reason = value_to_label(raw.reason).trim().to_string();
            (
                ClassificationResult {
                    product_area,
                    urgency,
                    reason,
                    model: model.to_string(),
                },
                ParseStatus::Ok,
            )
        }
        Err(_) => (ClassificationResult::fallback(model), ParseStatus::ParseError),
    }
}
