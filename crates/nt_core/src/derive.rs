//! Entity-variant derivations (§4.9): the transforms the core itself performs
//! on a parsed note body, as distinct from the Markdown segmentation handed
//! to it by the [`crate::parser`] collaborator boundary.

use crate::attribute::{AttributeMap, AttributeSchema};
use crate::oid::Oid;

/// Strips `` `#tag` `` and `` `@name: value` `` token lines from `body`,
/// hoisting them into a tag list and an attribute map. Tokens inside fenced
/// code blocks (delimited by a line starting with ` ``` `) are left in place
/// and not extracted, matching §4.9's "tags inside fenced code blocks are
/// preserved."
///
/// Returns `(rendered_body, tags)`. Attribute extraction is a separate pass
/// ([`extract_attributes`]) so callers can run them independently in tests.
pub fn extract_tags(body: &str) -> (String, Vec<String>) {
    let mut tags = Vec::new();
    let mut out_lines = Vec::new();
    let mut in_fence = false;

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            out_lines.push(line.to_string());
            continue;
        }
        if !in_fence {
            if let Some(found) = tags_only_line(trimmed) {
                tags.extend(found);
                continue;
            }
        }
        out_lines.push(line.to_string());
    }

    (out_lines.join("\n"), tags)
}

/// If `line` consists solely of one or more `` `#tag` `` tokens (whitespace
/// separated), returns the tag names (without the leading `#`). Otherwise
/// `None` — the line is ordinary content and must be preserved.
fn tags_only_line(line: &str) -> Option<Vec<String>> {
    if line.is_empty() {
        return None;
    }
    let mut tags = Vec::new();
    for token in line.split_whitespace() {
        let inner = token.strip_prefix('`')?.strip_suffix('`')?;
        let tag = inner.strip_prefix('#')?;
        if tag.is_empty() {
            return None;
        }
        tags.push(tag.to_string());
    }
    Some(tags)
}

/// Strips `` `@name: value` `` token lines from `body`, coercing each value
/// through `schema`. A coercion failure drops the attribute rather than
/// failing the whole note (§4.9) — lint surfaces the drop separately.
///
/// Returns `(rendered_body, attributes)`.
pub fn extract_attributes(body: &str, schema: &AttributeSchema) -> (String, AttributeMap) {
    let mut attributes = AttributeMap::new();
    let mut out_lines = Vec::new();
    let mut in_fence = false;

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            out_lines.push(line.to_string());
            continue;
        }
        if !in_fence {
            if let Some((name, value)) = attribute_only_line(trimmed) {
                if let Some(coerced) = schema.coerce(&name, &value) {
                    attributes.insert(name, coerced);
                }
                continue;
            }
        }
        out_lines.push(line.to_string());
    }

    (out_lines.join("\n"), attributes)
}

fn attribute_only_line(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('`')?.strip_suffix('`')?;
    let rest = inner.strip_prefix('@')?;
    let (name, value) = rest.split_once(':')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

/// Content hash of a note body after tags and attributes have been stripped
/// (§4.9): detects body-only changes independent of tag/attribute churn.
pub fn content_hash(raw_body: &str, schema: &AttributeSchema) -> Oid {
    let (stripped, _tags) = extract_tags(raw_body);
    let (stripped, _attrs) = extract_attributes(&stripped, schema);
    Oid::new_from_bytes(stripped.trim().as_bytes())
}

/// Splits a flashcard note's body on the first line equal to `---` (after
/// trimming) into `(front, back)` (§4.9). `None` if no separator is found —
/// callers should surface this as a lint error rather than panicking.
pub fn split_flashcard(body: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = body.lines().collect();
    let idx = lines.iter().position(|l| l.trim() == "---")?;
    let front = lines[..idx].join("\n").trim().to_string();
    let back = lines[idx + 1..].join("\n").trim().to_string();
    Some((front, back))
}

/// Extracts a go-link alias from a link's title, by the `go/<alias>`
/// convention (e.g. a Markdown link titled `go/docs`). `None` if the title
/// does not follow the convention — the link is then just a plain link, not
/// a [`crate::entity::GoLink`].
pub fn extract_go_name(title: &str) -> Option<String> {
    title.trim().strip_prefix("go/").map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeType;
    use std::collections::BTreeMap;

    fn schema() -> AttributeSchema {
        let mut types = BTreeMap::new();
        types.insert("priority".to_string(), AttributeType::Integer);
        AttributeSchema { types }
    }

    #[test]
    fn extract_tags_hoists_bare_tag_lines() {
        let body = "Some text.\n`#rust` `#systems`\nMore text.";
        let (rendered, tags) = extract_tags(body);
        assert_eq!(tags, vec!["rust".to_string(), "systems".to_string()]);
        assert!(!rendered.contains("#rust"));
        assert!(rendered.contains("Some text."));
    }

    #[test]
    fn extract_tags_preserves_tags_in_fenced_code() {
        let body = "```\n`#not-a-tag`\n```\nReal text.";
        let (rendered, tags) = extract_tags(body);
        assert!(tags.is_empty());
        assert!(rendered.contains("`#not-a-tag`"));
    }

    #[test]
    fn extract_attributes_coerces_and_strips() {
        let body = "Body.\n`@priority: 3`\nMore.";
        let (rendered, attrs) = extract_attributes(body, &schema());
        assert_eq!(attrs.get("priority"), Some(&crate::attribute::AttributeValue::Integer(3)));
        assert!(!rendered.contains("@priority"));
    }

    #[test]
    fn content_hash_ignores_tag_and_attribute_churn() {
        let schema = schema();
        let a = "Body text.\n`#tag-a`";
        let b = "Body text.\n`#tag-b`\n`@priority: 5`";
        assert_eq!(content_hash(a, &schema), content_hash(b, &schema));
    }

    #[test]
    fn content_hash_differs_on_body_change() {
        let schema = schema();
        assert_ne!(content_hash("Body one.", &schema), content_hash("Body two.", &schema));
    }

    #[test]
    fn split_flashcard_on_dash_separator() {
        let body = "Question?\n---\nAnswer.";
        let (front, back) = split_flashcard(body).unwrap();
        assert_eq!(front, "Question?");
        assert_eq!(back, "Answer.");
    }

    #[test]
    fn split_flashcard_without_separator_is_none() {
        assert!(split_flashcard("No separator here.").is_none());
    }

    #[test]
    fn go_name_extracted_from_go_slash_prefix() {
        assert_eq!(extract_go_name("go/docs"), Some("docs".to_string()));
        assert_eq!(extract_go_name("Documentation"), None);
    }
}
