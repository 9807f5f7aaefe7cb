//! Tri-state visibility. Stored rows carry free-form strings ("group" and
//! "groups" are synonyms for the shared tier); everything funnels through
//! [`Visibility::classify`] once at each ingress boundary so no other code
//! branches on the raw value.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Shared,
    Public,
}

impl Visibility {
    /// Classify a raw stored value. Total: null, empty and unrecognized
    /// input all fall back to `Private`, never to a wider tier.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw {
            Some("public") => Visibility::Public,
            Some("group") | Some("groups") => Visibility::Shared,
            _ => Visibility::Private,
        }
    }

    /// Canonical stored form. Legacy rows may still say `"group"`; new
    /// writes always use one of these three values.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Shared => "groups",
            Visibility::Public => "public",
        }
    }
}

/// List-page scope filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    #[default]
    All,
    Private,
    Shared,
    Public,
}

impl ScopeFilter {
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some("private") => ScopeFilter::Private,
            Some("shared") => ScopeFilter::Shared,
            Some("public") => ScopeFilter::Public,
            _ => ScopeFilter::All,
        }
    }

    /// Whether a row with the given raw visibility falls inside this scope.
    /// The shared scope matches both stored synonyms.
    pub fn matches(&self, raw: Option<&str>) -> bool {
        match self {
            ScopeFilter::All => true,
            ScopeFilter::Private => Visibility::classify(raw) == Visibility::Private,
            ScopeFilter::Shared => Visibility::classify(raw) == Visibility::Shared,
            ScopeFilter::Public => Visibility::classify(raw) == Visibility::Public,
        }
    }
}
