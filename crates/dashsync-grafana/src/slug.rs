//! Dashboard slugs

use serde::{Deserialize, Serialize};
use std::fmt;

/// URL-safe, lowercase identity of a dashboard.
///
/// Desired dashboards derive it from their title, remote dashboards from
/// their storage uri. Both sides must agree for a dashboard to be matched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Wrap an already-normalized slug
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Characters replaced before transliteration
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('&', "and"),
    ('@', "at"),
    ('\'', ""),
    ('"', ""),
    ('\u{2019}', ""),
];

/// Normalize a title into a slug, the way Grafana derives dashboard uris.
///
/// Substitutes `&` and `@` with words and drops quotes, transliterates to
/// ASCII, lowercases, keeps `[a-z0-9_]`, turns every other run of
/// characters into a single `-` and trims dashes at both ends. Returns an
/// empty string when nothing survives.
pub fn slugify(title: &str) -> String {
    let mut substituted = String::with_capacity(title.len());
    for c in title.chars() {
        match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => substituted.push_str(to),
            None => substituted.push(c),
        }
    }

    let ascii = deunicode::deunicode(&substituted).to_ascii_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}
