//! Markdown link-destination rewriting.
//!
//! The parser is used for *finding* links, not for rendering: destinations
//! are spliced back into the original buffer so author formatting survives
//! byte-for-byte everywhere else. [`scan_links`] collects every rewritable
//! destination with its byte spans; after the (async) resolver has decided
//! an outcome per occurrence, [`apply_outcomes`] performs the splice.

use std::ops::Range;

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};

use super::LinkOutcome;

/// One rewritable destination found in a Markdown buffer.
#[derive(Debug, Clone)]
pub struct LinkOccurrence {
    /// The parsed destination, entity- and escape-decoded.
    pub destination: String,
    /// Whether the occurrence embeds content (an image).
    pub is_embeddable: bool,
    kind: OccurrenceKind,
    dest_span: Range<usize>,
    element_span: Range<usize>,
    inner_span: Option<Range<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OccurrenceKind {
    Inline,
    Image,
    Autolink,
    ReferenceDefinition,
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Collects every rewritable link destination in the buffer.
///
/// Inline links and images, autolinks and reference definitions are
/// rewritable. Reference *uses* resolve through their definition; email
/// autolinks carry no scheme in the raw text and are left alone.
pub fn scan_links(source: &str) -> Vec<LinkOccurrence> {
    let mut occurrences = Vec::new();

    let parser = Parser::new_ext(source, parser_options());
    for (_label, definition) in parser.reference_definitions().iter() {
        if let Some(dest_span) = definition_dest_span(source, &definition.span) {
            occurrences.push(LinkOccurrence {
                destination: definition.dest.to_string(),
                is_embeddable: false,
                kind: OccurrenceKind::ReferenceDefinition,
                dest_span,
                element_span: definition.span.clone(),
                inner_span: None,
            });
        }
    }

    for (event, range) in Parser::new_ext(source, parser_options()).into_offset_iter() {
        let (link_type, dest_url, embeddable) = match &event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                ..
            }) => (*link_type, dest_url, false),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                ..
            }) => (*link_type, dest_url, true),
            _ => continue,
        };

        match link_type {
            LinkType::Inline => {
                if let Some((dest_span, inner_span)) = inline_dest_span(source, &range) {
                    occurrences.push(LinkOccurrence {
                        destination: dest_url.to_string(),
                        is_embeddable: embeddable,
                        kind: if embeddable {
                            OccurrenceKind::Image
                        } else {
                            OccurrenceKind::Inline
                        },
                        dest_span,
                        element_span: range,
                        inner_span: Some(inner_span),
                    });
                }
            }
            LinkType::Autolink => {
                occurrences.push(LinkOccurrence {
                    destination: dest_url.to_string(),
                    is_embeddable: false,
                    kind: OccurrenceKind::Autolink,
                    dest_span: range.start + 1..range.end - 1,
                    element_span: range,
                    inner_span: None,
                });
            }
            _ => {}
        }
    }

    occurrences.sort_by_key(|occurrence| occurrence.dest_span.start);
    occurrences
}

/// Splices the resolved outcomes back into the buffer.
///
/// `outcomes` pairs with `occurrences` by index. When a deleted element
/// contains further occurrences (an image inside a deleted link), the
/// outer erasure wins and the contained edits are dropped.
pub fn apply_outcomes(
    source: &str,
    occurrences: &[LinkOccurrence],
    outcomes: &[LinkOutcome],
) -> String {
    debug_assert_eq!(occurrences.len(), outcomes.len());

    struct Edit {
        span: Range<usize>,
        replacement: String,
    }

    let mut edits: Vec<Edit> = Vec::new();
    for (occurrence, outcome) in occurrences.iter().zip(outcomes) {
        match outcome {
            LinkOutcome::Keep => {}
            LinkOutcome::Rewrite(destination) => {
                if *destination != occurrence.destination {
                    edits.push(Edit {
                        span: occurrence.dest_span.clone(),
                        replacement: printable_destination(destination, occurrence.kind),
                    });
                }
            }
            LinkOutcome::Delete => {
                let replacement = match (occurrence.kind, &occurrence.inner_span) {
                    (OccurrenceKind::Inline, Some(inner)) => source[inner.clone()].to_string(),
                    _ => String::new(),
                };
                edits.push(Edit {
                    span: occurrence.element_span.clone(),
                    replacement,
                });
            }
        }
    }

    edits.sort_by_key(|edit| edit.span.start);
    let mut kept: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
        match kept.last() {
            Some(previous) if edit.span.start < previous.span.end => {}
            _ => kept.push(edit),
        }
    }

    let mut output = source.to_string();
    for edit in kept.iter().rev() {
        output.replace_range(edit.span.clone(), &edit.replacement);
    }
    output
}

/// Destinations with whitespace need pointy brackets in inline position.
fn printable_destination(destination: &str, kind: OccurrenceKind) -> String {
    let needs_brackets = destination.chars().any(char::is_whitespace);
    if needs_brackets && kind != OccurrenceKind::Autolink {
        format!("<{destination}>")
    } else {
        destination.to_string()
    }
}

/// Locates the destination and the bracketed inner text of an inline link
/// or image within its element span.
fn inline_dest_span(source: &str, range: &Range<usize>) -> Option<(Range<usize>, Range<usize>)> {
    let slice = &source[range.clone()];
    let open = slice.rfind("](")?;
    let text_start = slice.find('[')? + 1;
    let inner_span = range.start + text_start..range.start + open;

    let bytes = slice.as_bytes();
    let mut start = open + 2;
    while start < bytes.len() && bytes[start].is_ascii_whitespace() {
        start += 1;
    }

    let end = if bytes.get(start) == Some(&b'<') {
        start += 1;
        start + slice[start..].find('>')?
    } else {
        let mut depth = 0usize;
        let mut at = start;
        while at < bytes.len() {
            match bytes[at] {
                b'(' => depth += 1,
                b')' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                b' ' | b'\t' | b'\n' | b'\r' => break,
                _ => {}
            }
            at += 1;
        }
        at
    };

    Some((range.start + start..range.start + end, inner_span))
}

/// Locates the destination inside a reference definition span
/// (`[label]: dest "title"`).
fn definition_dest_span(source: &str, span: &Range<usize>) -> Option<Range<usize>> {
    let slice = &source[span.clone()];
    let colon = slice.find("]:")? + 2;
    let bytes = slice.as_bytes();

    let mut start = colon;
    while start < bytes.len() && bytes[start].is_ascii_whitespace() {
        start += 1;
    }

    let end = if bytes.get(start) == Some(&b'<') {
        start += 1;
        start + slice[start..].find('>')?
    } else {
        let mut at = start;
        while at < bytes.len() && !bytes[at].is_ascii_whitespace() {
            at += 1;
        }
        at
    };

    (start < end).then(|| span.start + start..span.start + end)
}
