//! Stage labels routing requests through the crawl
//!
//! Stages form a DAG with re-entry: `SubCategory` may recurse into itself and
//! `Detail` may enqueue further `Detail` requests for product variants.
use std::fmt;

/// The handler a request is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageLabel {
    /// The seed page; category navigation is read from it
    Start,

    /// A category page: either a leaf listing or an intermediate category
    SubCategory,

    /// A paginated continuation of a leaf category
    Listing,

    /// A product detail page
    Detail,
}

impl StageLabel {
    /// Returns true if a handler for `self` may produce requests labeled `next`
    ///
    /// This is the transition table of the crawl; the router never emits a
    /// request that violates it.
    pub fn may_enqueue(&self, next: StageLabel) -> bool {
        match self {
            Self::Start => matches!(next, Self::SubCategory),
            Self::SubCategory => matches!(next, Self::SubCategory | Self::Listing | Self::Detail),
            Self::Listing => matches!(next, Self::Detail),
            Self::Detail => matches!(next, Self::Detail),
        }
    }

    /// Returns the label as stored and logged
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::SubCategory => "SUBCAT",
            Self::Listing => "LIST",
            Self::Detail => "DETAIL",
        }
    }

    /// Parses a label from its stored representation
    pub fn from_str_label(s: &str) -> Option<Self> {
        match s {
            "START" => Some(Self::Start),
            "SUBCAT" => Some(Self::SubCategory),
            "LIST" => Some(Self::Listing),
            "DETAIL" => Some(Self::Detail),
            _ => None,
        }
    }

    /// Returns all stage labels
    pub fn all() -> [Self; 4] {
        [Self::Start, Self::SubCategory, Self::Listing, Self::Detail]
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
