//! Typed vocabulary for agent declarations.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "codex")]
    Codex,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Claude,
        ModelKind::Gemini,
        ModelKind::Gpt4,
        ModelKind::Codex,
        ModelKind::OpenAi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Claude => "claude",
            ModelKind::Gemini => "gemini",
            ModelKind::Gpt4 => "gpt-4",
            ModelKind::Codex => "codex",
            ModelKind::OpenAi => "openai",
        }
    }

    pub fn supported_list() -> String {
        join_names(Self::ALL.iter().map(|model| model.as_str()))
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "invalid model '{}'. valid values: {}",
                    value.trim(),
                    Self::supported_list()
                )
            })
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow phase an agent participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Planning,
    Design,
    Implementation,
    Coding,
    Testing,
    Review,
    Refactor,
    Documentation,
    Debugging,
    Optimization,
    Deployment,
}

/// Phases a healthy stack is expected to cover.
pub const CRITICAL_PHASES: [Phase; 3] = [Phase::Planning, Phase::Implementation, Phase::Testing];

const PHASE_ABBREVIATIONS: &[(&str, Phase)] = &[
    ("plan", Phase::Planning),
    ("impl", Phase::Implementation),
    ("code", Phase::Coding),
    ("test", Phase::Testing),
    ("doc", Phase::Documentation),
    ("docs", Phase::Documentation),
    ("debug", Phase::Debugging),
    ("opt", Phase::Optimization),
    ("deploy", Phase::Deployment),
    ("refact", Phase::Refactor),
];

impl Phase {
    pub const ALL: [Phase; 11] = [
        Phase::Planning,
        Phase::Design,
        Phase::Implementation,
        Phase::Coding,
        Phase::Testing,
        Phase::Review,
        Phase::Refactor,
        Phase::Documentation,
        Phase::Debugging,
        Phase::Optimization,
        Phase::Deployment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Design => "design",
            Phase::Implementation => "implementation",
            Phase::Coding => "coding",
            Phase::Testing => "testing",
            Phase::Review => "review",
            Phase::Refactor => "refactor",
            Phase::Documentation => "documentation",
            Phase::Debugging => "debugging",
            Phase::Optimization => "optimization",
            Phase::Deployment => "deployment",
        }
    }

    pub fn valid_list() -> String {
        join_names(Self::ALL.iter().map(|phase| phase.as_str()))
    }

    /// Best guess for a misspelled phase name.
    ///
    /// Substring containment in either direction wins first, in declaration
    /// order; otherwise a fixed table of common abbreviations is consulted.
    pub fn suggest(input: &str) -> Option<Phase> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return None;
        }

        let by_substring = Self::ALL.into_iter().find(|phase| {
            let name = phase.as_str();
            name.contains(input.as_str()) || input.contains(name)
        });
        if by_substring.is_some() {
            return by_substring;
        }

        PHASE_ABBREVIATIONS
            .iter()
            .find(|(abbrev, _)| *abbrev == input)
            .map(|(_, phase)| *phase)
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "invalid phase '{}'. valid values: {}",
                    value.trim(),
                    Self::valid_list()
                )
            })
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}
