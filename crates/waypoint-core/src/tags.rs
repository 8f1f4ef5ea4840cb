//! Tag encoding and reconciliation for tagged records.
//!
//! Records carry one flat `Vec<String>` of tags that mixes several roles:
//!
//! - **category**: at most one member of the record kind's vocabulary
//! - **integration groups**: `"Index File"` and/or `"Reference File"`
//! - **scope**: `refscope:open` or `refscope:full`, only alongside `"Reference File"`
//! - **description**: at most one `desc:<text>` pseudo-tag
//! - **use case**: at most one `usecase:<label>` pseudo-tag
//! - anything else is free-form and is never touched
//!
//! All prefix conventions live in this module. Actions describe what they
//! want to change with a [`TagIntent`] and call [`reconcile_tags`]; readers
//! that need the structured view use [`TagSet::parse`].

use serde::{Deserialize, Serialize};

// =============================================================================
// VOCABULARY
// =============================================================================

pub const INDEX_FILE: &str = "Index File";
pub const REFERENCE_FILE: &str = "Reference File";

pub const REFSCOPE_PREFIX: &str = "refscope:";
pub const DESC_PREFIX: &str = "desc:";
pub const USECASE_PREFIX: &str = "usecase:";

/// Use-case selector value meaning "take the free-text field instead".
pub const CUSTOM_USE_CASE: &str = "custom";

/// Legacy use-case value that means "no use case".
pub const LEGACY_NO_USE_CASE: &str = "Reference files";

pub const DOCUMENT_CATEGORIES: &[&str] =
    &["Contracts", "Policies", "Templates", "Various documents"];

pub const PRESENTATION_CATEGORIES: &[&str] =
    &["Company", "Product", "Sales", "Various presentations"];

pub const UPLOAD_CATEGORIES: &[&str] = &["Manuals", "Guides", "Checklists", "Various manuals"];

/// Classification of a reference/index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntegrationGroup {
    IndexFile,
    ReferenceFile,
}

impl IntegrationGroup {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::IndexFile => INDEX_FILE,
            Self::ReferenceFile => REFERENCE_FILE,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            INDEX_FILE => Some(Self::IndexFile),
            REFERENCE_FILE => Some(Self::ReferenceFile),
            _ => None,
        }
    }
}

/// Catalog tier of a reference file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefScope {
    /// Free tier.
    #[default]
    Open,
    /// Licensed tier.
    Full,
}

impl RefScope {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Open => "refscope:open",
            Self::Full => "refscope:full",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "refscope:open" => Some(Self::Open),
            "refscope:full" => Some(Self::Full),
            _ => None,
        }
    }
}

impl std::str::FromStr for RefScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "full" => Ok(Self::Full),
            _ => Err(format!("Invalid reference scope: {}", s)),
        }
    }
}

fn is_category(tag: &str, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|c| c.eq_ignore_ascii_case(tag.trim()))
}

fn is_scope_tag(tag: &str) -> bool {
    tag.starts_with(REFSCOPE_PREFIX)
}

// =============================================================================
// INTENT
// =============================================================================

/// Tri-state edit of one tag role.
///
/// `Keep` means the field was not part of the submission; `Clear` means it
/// was submitted empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Change<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Change<T> {
    pub fn is_touched(&self) -> bool {
        !matches!(self, Change::Keep)
    }

    /// `Some(v)` becomes `Set(v)`, `None` becomes `Clear`.
    pub fn submitted(value: Option<T>) -> Self {
        match value {
            Some(v) => Change::Set(v),
            None => Change::Clear,
        }
    }
}

/// Use-case selector plus its free-text companion field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UseCaseChoice {
    pub selected: String,
    pub custom: String,
}

impl UseCaseChoice {
    pub fn new(selected: impl Into<String>) -> Self {
        Self {
            selected: selected.into(),
            custom: String::new(),
        }
    }

    pub fn custom(text: impl Into<String>) -> Self {
        Self {
            selected: CUSTOM_USE_CASE.to_string(),
            custom: text.into(),
        }
    }

    /// The label to store, or `None` when the tag should be removed.
    pub fn resolve(&self) -> Option<String> {
        let selected = self.selected.trim();
        let value = if selected.eq_ignore_ascii_case(CUSTOM_USE_CASE) {
            self.custom.trim()
        } else {
            selected
        };
        if value.is_empty() || value == LEGACY_NO_USE_CASE {
            None
        } else {
            Some(value.to_string())
        }
    }
}

/// Requested changes to a record's tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagIntent {
    pub category: Change<String>,
    pub integration: Change<Vec<IntegrationGroup>>,
    pub scope: Change<RefScope>,
    pub description: Change<String>,
    pub use_case: Change<UseCaseChoice>,
}

impl TagIntent {
    /// Intent that changes nothing.
    pub fn keep() -> Self {
        Self::default()
    }

    /// Build an intent from a multi-select tag field.
    ///
    /// `None` means the field was not submitted and leaves category and
    /// integration tags alone. `Some(&[])` means every option was deselected
    /// and clears both. Otherwise the first vocabulary member becomes the
    /// category and recognised integration groups replace the group set.
    pub fn from_form_selection(selection: Option<&[String]>, vocabulary: &[&str]) -> Self {
        let Some(selected) = selection else {
            return Self::keep();
        };

        let category = selected
            .iter()
            .map(|s| s.trim())
            .find(|s| is_category(s, vocabulary))
            .map(|s| Change::Set(s.to_string()))
            .unwrap_or(Change::Clear);

        let mut groups: Vec<IntegrationGroup> = selected
            .iter()
            .filter_map(|s| IntegrationGroup::from_tag(s.trim()))
            .collect();
        groups.sort();
        groups.dedup();

        let integration = if groups.is_empty() {
            Change::Clear
        } else {
            Change::Set(groups)
        };

        Self {
            category,
            integration,
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Change::Set(category.into());
        self
    }

    pub fn with_integration(mut self, groups: Vec<IntegrationGroup>) -> Self {
        self.integration = Change::Set(groups);
        self
    }

    pub fn with_scope(mut self, scope: RefScope) -> Self {
        self.scope = Change::Set(scope);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Change::Set(description.into());
        self
    }

    pub fn with_use_case(mut self, choice: UseCaseChoice) -> Self {
        self.use_case = Change::Set(choice);
        self
    }

    pub fn is_noop(&self) -> bool {
        !self.category.is_touched()
            && !self.integration.is_touched()
            && !self.scope.is_touched()
            && !self.description.is_touched()
            && !self.use_case.is_touched()
    }
}

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Apply `intent` to `existing` and return the new tag list.
///
/// Roles the intent leaves at `Keep` are copied through untouched, as are
/// all free-form tags. Superseded single-value tags are removed before their
/// replacement is appended, and the result never contains duplicates
/// (first occurrence wins).
///
/// When "Reference File" ends up in the result and the integration or scope
/// role was touched, exactly one scope tag is written: the requested one,
/// else the scope the record already had, else `refscope:open` (unless the
/// scope was explicitly cleared). When "Reference File" is absent no scope
/// tag survives a touch.
pub fn reconcile_tags(existing: &[String], intent: &TagIntent, vocabulary: &[&str]) -> Vec<String> {
    let mut tags: Vec<String> = existing.to_vec();

    match &intent.category {
        Change::Keep => {}
        Change::Clear => tags.retain(|t| !is_category(t, vocabulary)),
        Change::Set(category) => {
            tags.retain(|t| !is_category(t, vocabulary));
            let category = category.trim();
            if !category.is_empty() {
                tags.push(category.to_string());
            }
        }
    }

    let previous_scope = tags.iter().find_map(|t| RefScope::from_tag(t));

    match &intent.integration {
        Change::Keep => {}
        Change::Clear => {
            tags.retain(|t| IntegrationGroup::from_tag(t).is_none() && !is_scope_tag(t))
        }
        Change::Set(groups) => {
            tags.retain(|t| IntegrationGroup::from_tag(t).is_none() && !is_scope_tag(t));
            tags.extend(groups.iter().map(|g| g.as_tag().to_string()));
        }
    }

    if intent.integration.is_touched() || intent.scope.is_touched() {
        tags.retain(|t| !is_scope_tag(t));
        if tags.iter().any(|t| t == REFERENCE_FILE) {
            let scope = match &intent.scope {
                Change::Set(scope) => Some(*scope),
                Change::Clear => None,
                Change::Keep => Some(previous_scope.unwrap_or_default()),
            };
            if let Some(scope) = scope {
                tags.push(scope.as_tag().to_string());
            }
        }
    }

    match &intent.description {
        Change::Keep => {}
        Change::Clear => tags.retain(|t| !t.starts_with(DESC_PREFIX)),
        Change::Set(description) => {
            tags.retain(|t| !t.starts_with(DESC_PREFIX));
            let description = description.trim();
            if !description.is_empty() {
                tags.push(format!("{}{}", DESC_PREFIX, description));
            }
        }
    }

    match &intent.use_case {
        Change::Keep => {}
        Change::Clear => tags.retain(|t| !t.starts_with(USECASE_PREFIX)),
        Change::Set(choice) => {
            tags.retain(|t| !t.starts_with(USECASE_PREFIX));
            if let Some(label) = choice.resolve() {
                tags.push(format!("{}{}", USECASE_PREFIX, label));
            }
        }
    }

    dedup_preserving_order(tags)
}

/// Drop repeated tags, keeping the first occurrence.
pub fn dedup_preserving_order(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(tags.len());
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

// =============================================================================
// STRUCTURED VIEW
// =============================================================================

/// Structured reading of a flat tag list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TagSet {
    pub category: Option<String>,
    pub integration_groups: Vec<IntegrationGroup>,
    pub scope: Option<RefScope>,
    pub description: Option<String>,
    pub use_case: Option<String>,
    /// Unrecognised tags, plus extra category tags from legacy rows.
    pub freeform: Vec<String>,
}

impl TagSet {
    pub fn parse(tags: &[String], vocabulary: &[&str]) -> Self {
        let mut set = Self::default();
        for tag in tags {
            if let Some(group) = IntegrationGroup::from_tag(tag) {
                if !set.integration_groups.contains(&group) {
                    set.integration_groups.push(group);
                }
            } else if let Some(scope) = RefScope::from_tag(tag) {
                set.scope.get_or_insert(scope);
            } else if let Some(desc) = tag.strip_prefix(DESC_PREFIX) {
                set.description.get_or_insert_with(|| desc.to_string());
            } else if let Some(use_case) = tag.strip_prefix(USECASE_PREFIX) {
                set.use_case.get_or_insert_with(|| use_case.to_string());
            } else if set.category.is_none() && is_category(tag, vocabulary) {
                set.category = Some(tag.clone());
            } else if !set.freeform.contains(tag) {
                set.freeform.push(tag.clone());
            }
        }
        set.integration_groups.sort();
        set
    }

    /// Serialize back to the flat encoding. A scope without
    /// "Reference File" is dropped.
    pub fn to_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(category) = &self.category {
            tags.push(category.clone());
        }
        tags.extend(self.integration_groups.iter().map(|g| g.as_tag().to_string()));
        if self.is_reference_file() {
            if let Some(scope) = self.scope {
                tags.push(scope.as_tag().to_string());
            }
        }
        if let Some(desc) = &self.description {
            tags.push(format!("{}{}", DESC_PREFIX, desc));
        }
        if let Some(use_case) = &self.use_case {
            tags.push(format!("{}{}", USECASE_PREFIX, use_case));
        }
        tags.extend(self.freeform.iter().cloned());
        dedup_preserving_order(tags)
    }

    pub fn is_reference_file(&self) -> bool {
        self.integration_groups.contains(&IntegrationGroup::ReferenceFile)
    }
}
