use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// `author/component-slug`, the name of one published component.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ComponentIdentifier {
    author: String,
    slug: String,
}

impl ComponentIdentifier {
    /// Splits on exactly one `/` into two non-empty, whitespace-free segments.
    pub fn parse(value: &str) -> Option<Self> {
        let (author, slug) = value.split_once('/')?;

        if author.is_empty() || slug.is_empty() || slug.contains('/') {
            return None;
        }

        if !is_segment(author) || !is_segment(slug) {
            return None;
        }

        Some(ComponentIdentifier {
            author: author.to_string(),
            slug: slug.to_string(),
        })
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }
}

fn is_segment(segment: &str) -> bool {
    segment
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_whitespace() && !c.is_ascii_control())
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.author, self.slug)
    }
}

impl Serialize for ComponentIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComponentIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ComponentIdentifier::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier `{raw}`")))
    }
}
