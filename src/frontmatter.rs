//! # Frontmatter Codec
//!
//! Lossless conversion between the on-disk memory file format (YAML
//! frontmatter fenced by `---` lines, followed by a markdown body) and the
//! in-memory [`Memory`] record.
//!
//! Keys are `snake_case` on disk. Keys the engine does not know are carried
//! through [`MemoryMetadata::extra`], so `parse(serialize(m)) == m` holds for
//! every valid memory, including ones with foreign metadata.
//!
//! Duplicate top-level keys follow YAML 1.2 last-value-wins. Earlier entries
//! are dropped in a pre-pass so the outcome does not depend on the YAML
//! parser's own duplicate handling.

use crate::error::{CortexError, Result};
use crate::model::{normalize_tags, Memory, MemoryMetadata};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_yaml::{Mapping, Value};

const KEY_CREATED_AT: &str = "created_at";
const KEY_UPDATED_AT: &str = "updated_at";
const KEY_TAGS: &str = "tags";
const KEY_SOURCE: &str = "source";
const KEY_EXPIRES_AT: &str = "expires_at";
const KEY_CITATIONS: &str = "citations";

/// Render a memory to its on-disk form.
pub fn serialize(memory: &Memory) -> Result<String> {
    let meta = &memory.metadata;
    let mut map = Mapping::new();
    map.insert(
        Value::String(KEY_CREATED_AT.into()),
        Value::String(format_timestamp(meta.created_at)),
    );
    map.insert(
        Value::String(KEY_UPDATED_AT.into()),
        Value::String(format_timestamp(meta.updated_at)),
    );
    map.insert(
        Value::String(KEY_TAGS.into()),
        Value::Sequence(meta.tags.iter().cloned().map(Value::String).collect()),
    );
    map.insert(
        Value::String(KEY_SOURCE.into()),
        Value::String(meta.source.clone()),
    );
    if let Some(at) = meta.expires_at {
        map.insert(
            Value::String(KEY_EXPIRES_AT.into()),
            Value::String(format_timestamp(at)),
        );
    }
    if !meta.citations.is_empty() {
        map.insert(
            Value::String(KEY_CITATIONS.into()),
            Value::Sequence(meta.citations.iter().cloned().map(Value::String).collect()),
        );
    }
    for (key, value) in &meta.extra {
        map.insert(key.clone(), value.clone());
    }

    let yaml = serde_yaml::to_string(&map)
        .map_err(|e| CortexError::index("failed to render frontmatter", e))?;
    Ok(format!("---\n{yaml}---\n{}", memory.content))
}

/// Parse an on-disk memory file. `origin` names the file in error messages.
pub fn parse(raw: &str, origin: &str) -> Result<Memory> {
    let (yaml, content) = split_frontmatter(raw, origin)?;
    let deduped = drop_duplicate_keys(yaml);
    let mut map: Mapping =
        serde_yaml::from_str(&deduped).map_err(|e| CortexError::InvalidFrontmatter {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

    let created_at = take_timestamp(&mut map, KEY_CREATED_AT, origin)?.ok_or_else(|| {
        missing_key(origin, KEY_CREATED_AT)
    })?;
    let updated_at = take_timestamp(&mut map, KEY_UPDATED_AT, origin)?.ok_or_else(|| {
        missing_key(origin, KEY_UPDATED_AT)
    })?;
    let expires_at = take_timestamp(&mut map, KEY_EXPIRES_AT, origin)?;
    let tags = normalize_tags(take_string_seq(&mut map, KEY_TAGS, origin)?)?;
    let citations = take_string_seq(&mut map, KEY_CITATIONS, origin)?;
    for citation in &citations {
        if citation.trim().is_empty() {
            return Err(CortexError::InvalidFrontmatter {
                path: origin.to_string(),
                reason: "citations must be non-empty strings".to_string(),
            });
        }
    }
    let source = match take(&mut map, KEY_SOURCE) {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(_) | None => return Err(CortexError::InvalidSource),
    };

    Ok(Memory {
        metadata: MemoryMetadata {
            created_at,
            updated_at,
            tags,
            source,
            expires_at,
            citations,
            extra: map,
        },
        content: content.to_string(),
    })
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| CortexError::InvalidTimestamp {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn missing_key(origin: &str, key: &str) -> CortexError {
    CortexError::InvalidFrontmatter {
        path: origin.to_string(),
        reason: format!("required key '{key}' is missing"),
    }
}

fn take(map: &mut Mapping, key: &str) -> Option<Value> {
    map.remove(&Value::String(key.to_string()))
}

fn take_timestamp(map: &mut Mapping, key: &str, origin: &str) -> Result<Option<DateTime<Utc>>> {
    match take(map, key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_timestamp(key, &s).map(Some),
        Some(other) => Err(CortexError::InvalidTimestamp {
            field: key.to_string(),
            value: yaml_scalar_repr(&other, origin)?,
        }),
    }
}

fn take_string_seq(map: &mut Mapping, key: &str, origin: &str) -> Result<Vec<String>> {
    match take(map, key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(seq)) => {
            let mut out = Vec::with_capacity(seq.len());
            for item in seq {
                match item {
                    Value::String(s) => out.push(s),
                    other => {
                        return Err(CortexError::InvalidFrontmatter {
                            path: origin.to_string(),
                            reason: format!(
                                "'{key}' must be a list of strings, found {}",
                                yaml_scalar_repr(&other, origin)?
                            ),
                        })
                    }
                }
            }
            Ok(out)
        }
        Some(_) => Err(CortexError::InvalidFrontmatter {
            path: origin.to_string(),
            reason: format!("'{key}' must be a list of strings"),
        }),
    }
}

fn yaml_scalar_repr(value: &Value, origin: &str) -> Result<String> {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .map_err(|e| CortexError::InvalidFrontmatter {
            path: origin.to_string(),
            reason: e.to_string(),
        })
}

/// Split `raw` into the YAML block and the body. Both fences are required.
fn split_frontmatter<'a>(raw: &'a str, origin: &str) -> Result<(&'a str, &'a str)> {
    let missing = || CortexError::MissingFrontmatter {
        path: origin.to_string(),
    };
    let rest = raw.strip_prefix("---\n").ok_or_else(missing)?;
    if let Some(pos) = rest.find("\n---\n") {
        // Keep the terminating newline on the YAML side.
        return Ok((&rest[..pos + 1], &rest[pos + 5..]));
    }
    if let Some(yaml) = rest.strip_suffix("\n---") {
        return Ok((yaml, ""));
    }
    Err(missing())
}

/// Remove all but the last occurrence of each top-level key.
///
/// A top-level key is a line that starts at column zero with `key:`. The
/// lines belonging to an overridden block (its nested continuation lines
/// included) are dropped wholesale.
fn drop_duplicate_keys(yaml: &str) -> String {
    let key_of = |line: &str| -> Option<String> {
        let first = line.chars().next()?;
        if first.is_whitespace() || first == '#' || first == '-' {
            return None;
        }
        line.split_once(':').map(|(k, _)| k.trim().to_string())
    };

    let lines: Vec<&str> = yaml.lines().collect();
    // Index of the block each line belongs to, block = top-level key span.
    let mut block_key: Vec<Option<(String, usize)>> = Vec::with_capacity(lines.len());
    let mut current: Option<(String, usize)> = None;
    for (i, line) in lines.iter().enumerate() {
        if let Some(key) = key_of(line) {
            current = Some((key, i));
        }
        block_key.push(current.clone());
    }

    let mut last_start: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for entry in block_key.iter().flatten() {
        last_start.insert(entry.0.clone(), entry.1);
    }

    let mut out = String::with_capacity(yaml.len());
    for (i, line) in lines.iter().enumerate() {
        let keep = match &block_key[i] {
            Some((key, start)) => last_start.get(key) == Some(start),
            None => true,
        };
        if keep {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
