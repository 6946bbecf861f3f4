use crate::error::ParseFieldKindError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque handle to a node owned by the host DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The semantic slots a page can be taught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    JobTitle,
    #[serde(alias = "company")]
    CompanyName,
}

impl FieldKind {
    pub const ALL: [FieldKind; 2] = [FieldKind::JobTitle, FieldKind::CompanyName];

    /// Prefix shared by every storage key belonging to this field.
    pub fn storage_prefix(&self) -> &'static str {
        match self {
            FieldKind::JobTitle => "jobTitle",
            FieldKind::CompanyName => "companyName",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::JobTitle => "Job Title",
            FieldKind::CompanyName => "Company Name",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_prefix())
    }
}

impl FromStr for FieldKind {
    type Err = ParseFieldKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "jobtitle" | "title" => Ok(FieldKind::JobTitle),
            "companyname" | "company" => Ok(FieldKind::CompanyName),
            _ => Err(ParseFieldKindError(s.to_string())),
        }
    }
}

/// Which specificity tier produced a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorTier {
    Id,
    ClassList,
    TestId,
    AriaLabel,
    Path,
}

impl LocatorTier {
    pub fn name(&self) -> &'static str {
        match self {
            LocatorTier::Id => "id",
            LocatorTier::ClassList => "class-list",
            LocatorTier::TestId => "test-id",
            LocatorTier::AriaLabel => "aria-label",
            LocatorTier::Path => "path",
        }
    }
}

/// Serialized descriptor used to relocate an element. Treated as opaque
/// outside of generation and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted association of a field to a locator plus its last extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub field_kind: FieldKind,
    pub locator: Locator,
    pub last_known_text: String,
    /// Absent for bindings written before capture times were recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

impl Binding {
    pub fn new(field_kind: FieldKind, locator: Locator, text: impl Into<String>) -> Self {
        Self {
            field_kind,
            locator,
            last_known_text: text.into(),
            captured_at: Some(Utc::now()),
        }
    }
}

/// Freshly computed text for each field. `None` means the field is not
/// bound, its locator matched nothing, or the match rendered no text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
}

impl ExtractionResult {
    pub fn get(&self, kind: FieldKind) -> Option<&str> {
        match kind {
            FieldKind::JobTitle => self.job_title.as_deref(),
            FieldKind::CompanyName => self.company_name.as_deref(),
        }
    }

    pub fn set(&mut self, kind: FieldKind, value: Option<String>) {
        match kind {
            FieldKind::JobTitle => self.job_title = value,
            FieldKind::CompanyName => self.company_name = value,
        }
    }
}

/// Requests accepted from the privileged UI context over the messaging bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    EnableSelection {
        #[serde(default)]
        mode: Option<FieldKind>,
    },
    DisableSelection,
    Extract,
}

/// Exactly one response is sent for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExtractionResult>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            result: None,
        }
    }

    pub fn with_result(result: ExtractionResult) -> Self {
        Self {
            success: true,
            result: Some(result),
        }
    }
}

/// A single structural change reported by the host's mutation observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationKind {
    ChildList {
        #[serde(default)]
        added: Vec<NodeId>,
        #[serde(default)]
        removed: Vec<NodeId>,
    },
    CharacterData,
    Attributes {
        name: String,
    },
}
