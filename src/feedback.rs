use crate::analysis::{ContentAnalysis, DeliveryAnalysis, Observation, ScriptAnalysis};
use crate::timestamp::{self, Separator};
use tracing::warn;

/// One actionable timestamp. `seconds` is `None` when the raw token failed
/// normalization; the control still renders its label but activating it
/// does nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampControl {
    pub label: String,
    pub seconds: Option<u32>,
}

/// One feedback item: zero or more timestamp controls, the text that
/// follows them on the same line, and any detail lines below.
/// Empty-state placeholders are entries with no controls.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub controls: Vec<TimestampControl>,
    pub lead: String,
    pub detail: Vec<String>,
}

impl Entry {
    fn placeholder(text: &str) -> Self {
        Self {
            controls: Vec::new(),
            lead: text.to_string(),
            detail: Vec::new(),
        }
    }
}

/// A collapsible group of entries ("pros", "areas of improvement",
/// "omissions", ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub title: String,
    pub entries: Vec<Entry>,
}

/// One block inside a section, in display order.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(String),
    /// Filler-word tags like "um (4)".
    Tags(Vec<String>),
    Text(String),
    /// Dim hint rendered next to the preceding heading.
    Note(String),
    Groups(Vec<Group>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<Block>,
}

/// Pure projection of the two analysis documents into a display tree.
///
/// Empty (`sections` empty) means neither document was provided and the
/// caller renders the single "no analysis available" indicator. A present
/// document with empty sub-lists still projects, with the defined
/// empty-state texts. The two sections are independent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedbackTree {
    pub sections: Vec<Section>,
}

pub const NO_ANALYSIS: &str = "no analysis available";
pub const SPEECH_RATE_HINT: &str =
    "A good rate of speech ranges between 140-160 words per minute";

impl FeedbackTree {
    pub fn project(
        delivery: Option<&DeliveryAnalysis>,
        content: Option<&ContentAnalysis>,
    ) -> Self {
        let mut sections = Vec::new();
        if let Some(delivery) = delivery {
            sections.push(project_delivery(delivery));
        }
        if let Some(content) = content {
            sections.push(project_content(content));
        }
        Self { sections }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// All timestamp controls in display order, for focus traversal.
    pub fn controls(&self) -> Vec<&TimestampControl> {
        self.sections
            .iter()
            .flat_map(|s| &s.blocks)
            .filter_map(|b| match b {
                Block::Groups(groups) => Some(groups),
                _ => None,
            })
            .flatten()
            .flat_map(|g| &g.entries)
            .flat_map(|e| &e.controls)
            .collect()
    }
}

fn project_delivery(delivery: &DeliveryAnalysis) -> Section {
    let mut blocks = vec![Block::Heading("filler words".into())];

    let tags: Vec<String> = delivery
        .filler_words
        .iter()
        .flatten()
        .map(|(word, count)| format!("{} ({})", word, count))
        .collect();
    if tags.is_empty() {
        blocks.push(Block::Text("none found".into()));
    } else {
        blocks.push(Block::Tags(tags));
    }

    blocks.push(Block::Heading("speaking rate".into()));
    blocks.push(Block::Note(SPEECH_RATE_HINT.into()));
    let rate = match delivery.speech_rate_wpm {
        Some(wpm) if wpm.fract() == 0.0 => format!("{:.0}", wpm),
        Some(wpm) => format!("{}", wpm),
        None => "N/A".into(),
    };
    blocks.push(Block::Text(format!("{} words per minute", rate)));

    blocks.push(Block::Heading("body language".into()));
    blocks.push(Block::Groups(vec![
        body_language_group(
            "pros",
            &delivery.body_language_analysis.pros,
            "no pros found",
        ),
        body_language_group(
            "areas of improvement",
            &delivery.body_language_analysis.cons,
            "no areas of improvement found, you did perfect!",
        ),
    ]));

    Section {
        title: "delivery analysis".into(),
        blocks,
    }
}

fn body_language_group(title: &str, observations: &[Observation], empty_text: &str) -> Group {
    let entries = if observations.is_empty() {
        vec![Entry::placeholder(empty_text)]
    } else {
        observations
            .iter()
            .map(|obs| Entry {
                controls: multi_controls(&obs.timestamp),
                lead: format!(": {}", obs.description),
                detail: Vec::new(),
            })
            .collect()
    };
    Group {
        title: title.to_string(),
        entries,
    }
}

/// Body-language timestamps may list several moments; each becomes its own
/// control, grouped on the entry.
fn multi_controls(raw: &str) -> Vec<TimestampControl> {
    timestamp::parse_list(raw, Separator::Colon)
        .into_iter()
        .map(|(label, parsed)| {
            let seconds = match parsed {
                Ok(secs) => Some(secs),
                Err(err) => {
                    warn!(%err, "unparseable body-language timestamp, control left inert");
                    None
                }
            };
            TimestampControl { label, seconds }
        })
        .collect()
}

/// Outline/script timestamps use the dot convention; the label is shown
/// colon-separated like every other timestamp on screen.
fn dot_control(raw: &str) -> TimestampControl {
    let trimmed = raw.trim();
    let seconds = match timestamp::parse_token(trimmed, Separator::Dot) {
        Ok(secs) => Some(secs),
        Err(err) => {
            warn!(%err, "unparseable outline/script timestamp, control left inert");
            None
        }
    };
    TimestampControl {
        label: trimmed.replace('.', ":"),
        seconds,
    }
}

fn project_content(content: &ContentAnalysis) -> Section {
    let mut blocks = Vec::new();

    if let Some(outline) = &content.content_analysis {
        blocks.push(Block::Heading("outline feedback".into()));

        let pros = if outline.pros.is_empty() {
            vec![Entry::placeholder("no strengths found in outline.")]
        } else {
            outline
                .pros
                .iter()
                .map(|obs| Entry {
                    controls: vec![dot_control(&obs.timestamp)],
                    lead: format!(": {}", obs.outline_point),
                    detail: obs
                        .transcript_excerpt
                        .iter()
                        .cloned()
                        .chain(std::iter::once(obs.suggestion.clone()))
                        .collect(),
                })
                .collect()
        };

        let cons = if outline.cons.is_empty() {
            vec![Entry::placeholder(
                "no weaknesses found in outline — great job!",
            )]
        } else {
            outline
                .cons
                .iter()
                .map(|obs| Entry {
                    controls: vec![dot_control(&obs.timestamp)],
                    lead: format!(": {}", obs.outline_point),
                    detail: obs
                        .issue
                        .iter()
                        .cloned()
                        .chain(std::iter::once(obs.suggestion.clone()))
                        .collect(),
                })
                .collect()
        };

        blocks.push(Block::Groups(vec![
            Group {
                title: "pros".into(),
                entries: pros,
            },
            Group {
                title: "areas of improvement".into(),
                entries: cons,
            },
        ]));
    }

    if let Some(script) = &content.script_analysis {
        blocks.push(Block::Heading("script feedback".into()));
        let groups = ScriptAnalysis::CATEGORIES
            .iter()
            .map(|category| {
                let observations = script.category(category);
                let entries = if observations.is_empty() {
                    vec![Entry::placeholder(&format!("no {} found", category))]
                } else {
                    observations
                        .iter()
                        .map(|obs| Entry {
                            controls: vec![dot_control(&obs.timestamp)],
                            lead: String::new(),
                            detail: vec![
                                format!("script: {}", obs.script_excerpt),
                                format!("transcript: {}", obs.transcript_excerpt),
                                format!("note: {}", obs.note),
                            ],
                        })
                        .collect()
                };
                Group {
                    title: category.to_string(),
                    entries,
                }
            })
            .collect();
        blocks.push(Block::Groups(groups));
    }

    Section {
        title: "content analysis".into(),
        blocks,
    }
}
