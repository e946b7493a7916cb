use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Delivery-side feedback document produced by the analysis pipeline.
///
/// Consumed read-only; absence of the whole document is distinct from a
/// document whose lists are empty (empty lists still render their
/// empty-state text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeliveryAnalysis {
    #[serde(default)]
    pub filler_words: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub speech_rate_wpm: Option<f64>,
    #[serde(default)]
    pub body_language_analysis: BodyLanguageAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BodyLanguageAnalysis {
    #[serde(default)]
    pub pros: Vec<Observation>,
    #[serde(default)]
    pub cons: Vec<Observation>,
}

/// One body-language observation. `timestamp` uses `MM:SS` and may hold a
/// comma-separated list of moments ("1:02, 1:15").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: String,
    pub description: String,
}

/// Content-side feedback document (outline and script sub-analyses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContentAnalysis {
    #[serde(default)]
    pub content_analysis: Option<OutlineAnalysis>,
    #[serde(default)]
    pub script_analysis: Option<ScriptAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OutlineAnalysis {
    #[serde(default)]
    pub pros: Vec<OutlineObservation>,
    #[serde(default)]
    pub cons: Vec<OutlineObservation>,
}

/// Outline observation; `timestamp` uses a dot separator ("1.02").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineObservation {
    pub timestamp: String,
    pub outline_point: String,
    #[serde(default)]
    pub transcript_excerpt: Option<String>,
    pub suggestion: String,
    #[serde(default)]
    pub issue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScriptAnalysis {
    #[serde(default)]
    pub omissions: Vec<ScriptObservation>,
    #[serde(default)]
    pub additions: Vec<ScriptObservation>,
    #[serde(default)]
    pub paraphrases: Vec<ScriptObservation>,
}

impl ScriptAnalysis {
    /// Categories in their fixed display order.
    pub const CATEGORIES: [&'static str; 3] = ["omissions", "additions", "paraphrases"];

    pub fn category(&self, name: &str) -> &[ScriptObservation] {
        match name {
            "omissions" => &self.omissions,
            "additions" => &self.additions,
            "paraphrases" => &self.paraphrases,
            _ => &[],
        }
    }
}

/// Script observation; `timestamp` uses a dot separator ("1.02").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptObservation {
    pub timestamp: String,
    pub script_excerpt: String,
    pub transcript_excerpt: String,
    pub note: String,
}
