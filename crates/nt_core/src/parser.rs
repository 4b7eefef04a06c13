//! Markdown parsing collaborator boundary (§1 Non-goals, §9).
//!
//! The core never inspects Markdown syntax directly: it consumes whatever
//! implements [`FileParser`] and receives back a [`ParsedFile`] of already
//! heading-segmented notes plus their raw link/image references. Tag and
//! attribute extraction, content hashing, and flashcard splitting all happen
//! afterwards, on the core side, in [`crate::derive`].
//!
//! [`DefaultParser`] is a minimal real implementation (heading depth plus
//! YAML front matter) so the commit engine has something to drive end to
//! end; a fuller Markdown engine can replace it without touching the walker.

use serde::{Deserialize, Serialize};

/// A Markdown link or image reference found inside a note's body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedLink {
    pub title: String,
    pub url: String,
}

/// An image/media reference found inside a note's body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedMediaRef {
    pub relative_path: String,
}

/// One heading-scoped section of a parsed file, before entity derivation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedNote {
    /// Heading text.
    pub title: String,
    /// Index into the parent [`ParsedFile::notes`] vector of the nearest
    /// enclosing heading at a shallower depth, if any.
    pub parent_index: Option<usize>,
    /// Explicit `@kind: <kind>` attribute value, if the note declared one.
    pub declared_kind: Option<String>,
    /// Raw text of the section, heading line excluded.
    pub raw_content: String,
    pub links: Vec<ParsedLink>,
    pub images: Vec<ParsedMediaRef>,
}

/// The output of parsing one source file: front-matter attributes (raw,
/// pre-coercion) plus a flat list of heading-scoped notes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub front_matter: std::collections::BTreeMap<String, String>,
    pub notes: Vec<ParsedNote>,
}

/// The collaborator capability the walker consumes (§1, §9).
pub trait FileParser {
    fn parse(&self, content: &str) -> ParsedFile;
}

/// Minimal real `FileParser`: YAML front matter delimited by a leading and
/// trailing `---` line, then ATX headings (`#`, `##`, ...) segment the rest
/// into a note forest keyed by heading depth.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultParser;

impl FileParser for DefaultParser {
    fn parse(&self, content: &str) -> ParsedFile {
        let (front_matter, rest) = split_front_matter(content);
        let notes = segment_headings(rest);
        ParsedFile { front_matter, notes }
    }
}

fn split_front_matter(content: &str) -> (std::collections::BTreeMap<String, String>, &str) {
    let mut front_matter = std::collections::BTreeMap::new();
    let Some(after_open) = content.strip_prefix("---\n") else {
        return (front_matter, content);
    };
    let Some(close_at) = after_open.find("\n---\n") else {
        return (front_matter, content);
    };
    let block = &after_open[..close_at];
    let rest = &after_open[close_at + "\n---\n".len()..];

    for line in block.lines() {
        if let Some((key, value)) = line.split_once(':') {
            front_matter.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    (front_matter, rest)
}

fn segment_headings(body: &str) -> Vec<ParsedNote> {
    let mut notes: Vec<ParsedNote> = Vec::new();
    // Stack of (depth, index-into-notes) for the currently open headings.
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut current: Option<usize> = None;
    let mut buffer = String::new();

    let flush = |notes: &mut Vec<ParsedNote>, current: Option<usize>, buffer: &mut String| {
        if let Some(idx) = current {
            let (links, images) = extract_refs(buffer);
            notes[idx].raw_content = buffer.trim().to_string();
            notes[idx].links = links;
            notes[idx].images = images;
        }
        buffer.clear();
    };

    for line in body.lines() {
        if let Some((depth, title)) = heading(line) {
            flush(&mut notes, current, &mut buffer);

            while stack.last().map(|(d, _)| *d >= depth).unwrap_or(false) {
                stack.pop();
            }
            let parent_index = stack.last().map(|(_, i)| *i);
            let declared_kind = None;

            let idx = notes.len();
            notes.push(ParsedNote {
                title: title.to_string(),
                parent_index,
                declared_kind,
                raw_content: String::new(),
                links: Vec::new(),
                images: Vec::new(),
            });
            stack.push((depth, idx));
            current = Some(idx);
        } else {
            buffer.push_str(line);
            buffer.push('\n');
        }
    }
    flush(&mut notes, current, &mut buffer);

    for note in &mut notes {
        if let Some(kind_line) = note
            .raw_content
            .lines()
            .find_map(|l| l.trim().strip_prefix("`@kind:").and_then(|r| r.strip_suffix('`')))
        {
            note.declared_kind = Some(kind_line.trim().to_string());
        }
    }

    notes
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_end();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = trimmed[hashes..].trim();
    if rest.is_empty() || !trimmed[hashes..].starts_with(' ') {
        return None;
    }
    Some((hashes, rest))
}

/// Extracts `[title](url)` links and `![alt](path)` image references from a
/// note body. Link/image syntax detection only — no rendering.
fn extract_refs(body: &str) -> (Vec<ParsedLink>, Vec<ParsedMediaRef>) {
    let mut links = Vec::new();
    let mut images = Vec::new();
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let is_image = bytes[i] == b'!' && i + 1 < bytes.len() && bytes[i + 1] == b'[';
        let start_bracket = if is_image { i + 1 } else { i };
        if bytes.get(start_bracket) == Some(&b'[') {
            if let Some((title, url, end)) = parse_markdown_link(&body[start_bracket..]) {
                if is_image {
                    images.push(ParsedMediaRef { relative_path: url });
                } else {
                    links.push(ParsedLink { title, url });
                }
                i = start_bracket + end;
                continue;
            }
        }
        i += 1;
    }
    (links, images)
}

fn parse_markdown_link(s: &str) -> Option<(String, String, usize)> {
    let close_bracket = s.find(']')?;
    if s.as_bytes().get(close_bracket + 1) != Some(&b'(') {
        return None;
    }
    let close_paren_rel = s[close_bracket + 2..].find(')')?;
    let title = s[1..close_bracket].to_string();
    let url = s[close_bracket + 2..close_bracket + 2 + close_paren_rel].to_string();
    Some((title, url, close_bracket + 2 + close_paren_rel + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_front_matter_block() {
        let content = "---\ntitle: Go\nauthor: me\n---\n# Heading\nBody.";
        let parsed = DefaultParser.parse(content);
        assert_eq!(parsed.front_matter.get("title"), Some(&"Go".to_string()));
        assert_eq!(parsed.notes.len(), 1);
        assert_eq!(parsed.notes[0].title, "Heading");
    }

    #[test]
    fn no_front_matter_is_fine() {
        let content = "# Heading\nBody text.";
        let parsed = DefaultParser.parse(content);
        assert!(parsed.front_matter.is_empty());
        assert_eq!(parsed.notes[0].raw_content, "Body text.");
    }

    #[test]
    fn nested_headings_build_parent_chain() {
        let content = "# Root\nIntro.\n## Child\nChild body.\n### Grandchild\nDeep body.";
        let parsed = DefaultParser.parse(content);
        assert_eq!(parsed.notes.len(), 3);
        assert_eq!(parsed.notes[0].parent_index, None);
        assert_eq!(parsed.notes[1].parent_index, Some(0));
        assert_eq!(parsed.notes[2].parent_index, Some(1));
    }

    #[test]
    fn sibling_headings_share_parent() {
        let content = "# Root\n## A\nBody A.\n## B\nBody B.";
        let parsed = DefaultParser.parse(content);
        assert_eq!(parsed.notes[1].parent_index, Some(0));
        assert_eq!(parsed.notes[2].parent_index, Some(0));
    }

    #[test]
    fn extracts_links_and_images() {
        let content = "# Go\nSee [go/docs](https://example.com) and ![alt](./medias/go.svg).";
        let parsed = DefaultParser.parse(content);
        let note = &parsed.notes[0];
        assert_eq!(note.links, vec![ParsedLink {
            title: "go/docs".to_string(),
            url: "https://example.com".to_string(),
        }]);
        assert_eq!(note.images, vec![ParsedMediaRef {
            relative_path: "./medias/go.svg".to_string(),
        }]);
    }

    #[test]
    fn declared_kind_attribute_is_picked_up() {
        let content = "# Card\n`@kind: flashcard`\nFront\n---\nBack";
        let parsed = DefaultParser.parse(content);
        assert_eq!(parsed.notes[0].declared_kind, Some("flashcard".to_string()));
    }
}
