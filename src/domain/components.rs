//! Component records and the identifiers used to look them up.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A published component as stored in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub id: i64,
    pub owner_id: String,
    pub slug: String,
    pub code_ref: Option<String>,
    pub demo_code_ref: Option<String>,
    pub tailwind_extension_ref: Option<String>,
    pub global_css_extension_ref: Option<String>,
    pub compiled_css_cache: Option<String>,
}

impl ComponentRecord {
    /// Blob keys owned by this component, in field order, without blanks or repeats.
    pub fn blob_refs(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::with_capacity(4);
        for candidate in [
            self.code_ref.as_deref(),
            self.demo_code_ref.as_deref(),
            self.tailwind_extension_ref.as_deref(),
            self.global_css_extension_ref.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            if !candidate.is_empty() && !keys.contains(&candidate) {
                keys.push(candidate);
            }
        }
        keys
    }
}

/// Nullable metadata fields the core is allowed to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentField {
    CompiledCss,
}

impl ComponentField {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentField::CompiledCss => "compiled_css",
        }
    }
}

/// Caller-facing identifier for a single component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentIdentifier {
    ById(i64),
    ByOwnerAndSlug { owner_id: String, slug: String },
}

impl ComponentIdentifier {
    pub fn by_owner_and_slug(owner_id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::ByOwnerAndSlug {
            owner_id: owner_id.into(),
            slug: slug.into(),
        }
    }

    /// Map the identifier onto the metadata-store filter that selects it.
    pub fn filter(&self) -> ComponentFilter {
        match self {
            ComponentIdentifier::ById(id) => ComponentFilter::Id(*id),
            ComponentIdentifier::ByOwnerAndSlug { owner_id, slug } => {
                ComponentFilter::OwnerAndSlug {
                    owner_id: owner_id.clone(),
                    slug: slug.clone(),
                }
            }
        }
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentIdentifier::ById(id) => write!(f, "{id}"),
            ComponentIdentifier::ByOwnerAndSlug { owner_id, slug } => {
                write!(f, "{owner_id}/{slug}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierParseError {
    #[error("component identifier must not be empty")]
    Empty,
    #[error("invalid component identifier `{0}`: expected <id> or <owner_id>/<slug>")]
    Malformed(String),
    #[error("component id `{0}` is out of range")]
    IdOutOfRange(String),
}

impl FromStr for ComponentIdentifier {
    type Err = IdentifierParseError;

    /// Accepts a bare numeric id or `<owner_id>/<slug>` with both parts non-empty.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(IdentifierParseError::Empty);
        }

        if input.bytes().all(|byte| byte.is_ascii_digit()) {
            return input
                .parse::<i64>()
                .map(ComponentIdentifier::ById)
                .map_err(|_| IdentifierParseError::IdOutOfRange(input.to_string()));
        }

        let mut parts = input.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner_id), Some(slug), None) if !owner_id.is_empty() && !slug.is_empty() => {
                Ok(ComponentIdentifier::by_owner_and_slug(owner_id, slug))
            }
            _ => Err(IdentifierParseError::Malformed(input.to_string())),
        }
    }
}

/// Equality filter understood by the metadata store.
///
/// `Slug` has no identifier counterpart: only the public registry endpoint looks
/// components up by slug alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentFilter {
    Id(i64),
    OwnerAndSlug { owner_id: String, slug: String },
    Slug(String),
}

impl ComponentFilter {
    pub fn matches(&self, record: &ComponentRecord) -> bool {
        match self {
            ComponentFilter::Id(id) => record.id == *id,
            ComponentFilter::OwnerAndSlug { owner_id, slug } => {
                record.owner_id == *owner_id && record.slug == *slug
            }
            ComponentFilter::Slug(slug) => record.slug == *slug,
        }
    }
}
