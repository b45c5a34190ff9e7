//! OpenAlex entity identifier resolution
//!
//! Accepts bare identifiers (`W2741809807`) as well as the URL forms the API
//! hands out (`https://openalex.org/W2741809807`,
//! `https://api.openalex.org/works/W2741809807`) and reduces them to the
//! canonical `<kind letter><digits>` form.

use crate::errors::ResolveError;
use crate::models::{EntityKind, WorkId};
use regex_lite::Regex;
use std::sync::OnceLock;

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:(?:https?://)?(?:api\.)?openalex\.org/(?:(works|authors|institutions|sources)/)?)?([WAIS])(\d+)$",
        )
        .expect("entity pattern is valid")
    })
}

/// Parse any supported entity reference into its kind and canonical id
pub fn parse_entity(raw: &str) -> Result<(EntityKind, String), ResolveError> {
    let invalid = || ResolveError::InvalidIdentifier(raw.to_string());

    let caps = entity_pattern().captures(raw.trim()).ok_or_else(invalid)?;
    let letter = caps
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .ok_or_else(invalid)?;
    let kind = EntityKind::from_letter(letter).ok_or_else(invalid)?;

    // `/works/A123` names a collection that cannot hold the entity
    if let Some(collection) = caps.get(1) {
        if !collection.as_str().eq_ignore_ascii_case(kind.collection()) {
            return Err(invalid());
        }
    }

    let digits = caps.get(3).map(|m| m.as_str()).ok_or_else(invalid)?;
    Ok((kind, format!("{}{}", kind.letter(), digits)))
}

/// Normalize a work reference to a [`WorkId`]
pub fn normalize_work(raw: &str) -> Result<WorkId, ResolveError> {
    match parse_entity(raw)? {
        (EntityKind::Work, id) => Ok(WorkId::from_canonical(id)),
        _ => Err(ResolveError::InvalidIdentifier(raw.to_string())),
    }
}
