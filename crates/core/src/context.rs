//! Turns retrieval matches into the prompt context and the answer's citations.

use crate::models::{Citation, SNIPPET_MAX_CHARS};
use crate::store::VectorMatch;
use serde_json::Value;
use uuid::Uuid;

/// Outcome of reading a match's `document_id` metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRef {
    Parsed(Uuid),
    /// Missing or not a UUID. Displayed as the nil UUID.
    Unparsable,
}

impl DocumentRef {
    pub fn from_metadata(value: Option<&Value>) -> Self {
        value
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map_or(Self::Unparsable, Self::Parsed)
    }

    pub fn id(self) -> Uuid {
        match self {
            Self::Parsed(id) => id,
            Self::Unparsable => Uuid::nil(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub context: String,
    pub citations: Vec<Citation>,
    /// Parallel to `citations`.
    pub document_refs: Vec<DocumentRef>,
}

pub fn assemble_context(matches: &[VectorMatch]) -> AssembledContext {
    let mut sections = Vec::with_capacity(matches.len());
    let mut citations = Vec::with_capacity(matches.len());
    let mut document_refs = Vec::with_capacity(matches.len());

    for hit in matches {
        let metadata = &hit.metadata;
        let text = metadata.get("text").and_then(Value::as_str).unwrap_or_default();
        let page = metadata.get("page");
        let chunk_index = metadata.get("chunk_index");
        let document_id = metadata.get("document_id");

        sections.push(format!(
            "[Doc {} | Page {} | Chunk {}] {}",
            display_value(document_id, "None"),
            display_value(page, "0"),
            display_value(chunk_index, "0"),
            text
        ));

        let document_ref = DocumentRef::from_metadata(document_id);
        citations.push(Citation {
            document_id: document_ref.id(),
            page: coerce_page(page),
            score: hit.score,
            snippet: snippet(text),
        });
        document_refs.push(document_ref);
    }

    AssembledContext {
        context: sections.join("\n\n"),
        citations,
        document_refs,
    }
}

fn display_value(value: Option<&Value>, missing: &str) -> String {
    match value {
        None | Some(Value::Null) => missing.to_string(),
        Some(Value::String(text)) => text.clone(),
        // Hosted indexes hand numeric metadata back as floats.
        Some(Value::Number(number)) => match number.as_f64() {
            Some(float) if number.is_f64() && float.fract() == 0.0 => format!("{float:.0}"),
            _ => number.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

fn coerce_page(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|page| *page >= 0.0).map(|page| page as u64))
            .and_then(|page| u32::try_from(page).ok())
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn hit(score: f64, metadata: Value) -> VectorMatch {
        let metadata: Map<String, Value> = match metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        VectorMatch {
            id: "ignored".to_string(),
            score,
            metadata,
        }
    }

    #[test]
    fn matches_render_in_input_order() {
        let doc = Uuid::new_v4();
        let matches = vec![
            hit(
                0.9,
                json!({
                    "document_id": doc.to_string(),
                    "page": 2,
                    "chunk_index": 5,
                    "text": "second page",
                }),
            ),
            hit(
                0.7,
                json!({
                    "document_id": doc.to_string(),
                    "page": 1,
                    "chunk_index": 0,
                    "text": "first page",
                }),
            ),
        ];

        let assembled = assemble_context(&matches);

        assert_eq!(
            assembled.context,
            format!(
                "[Doc {doc} | Page 2 | Chunk 5] second page\n\n\
                 [Doc {doc} | Page 1 | Chunk 0] first page"
            )
        );
        assert_eq!(assembled.citations.len(), 2);
        assert_eq!(assembled.citations[0].page, 2);
        assert_eq!(assembled.citations[0].document_id, doc);
        assert!(assembled.citations[0].score > assembled.citations[1].score);
        assert_eq!(assembled.document_refs, vec![DocumentRef::Parsed(doc); 2]);
    }

    #[test]
    fn snippets_never_exceed_the_limit() {
        let long = "é".repeat(1_000);
        let assembled = assemble_context(&[hit(0.5, json!({"text": long}))]);

        assert_eq!(assembled.citations[0].snippet.chars().count(), SNIPPET_MAX_CHARS);
        let short = assemble_context(&[hit(0.5, json!({"text": "tiny"}))]);
        assert_eq!(short.citations[0].snippet, "tiny");
    }

    #[test]
    fn bad_document_ids_fall_back_to_nil() {
        let assembled = assemble_context(&[
            hit(0.5, json!({"document_id": "not-a-uuid", "text": "x"})),
            hit(0.4, json!({"text": "y"})),
        ]);

        assert_eq!(assembled.document_refs, vec![DocumentRef::Unparsable; 2]);
        assert!(assembled.citations.iter().all(|citation| citation.document_id.is_nil()));
        assert!(assembled.context.starts_with("[Doc not-a-uuid | Page 0 | Chunk 0] x"));
        assert!(assembled.context.contains("[Doc None | Page 0 | Chunk 0] y"));
    }

    #[test]
    fn page_coercion_is_permissive() {
        assert_eq!(coerce_page(Some(&json!(4))), 4);
        assert_eq!(coerce_page(Some(&json!(7.0))), 7);
        assert_eq!(coerce_page(Some(&json!("12"))), 12);
        assert_eq!(coerce_page(Some(&json!("twelve"))), 0);
        assert_eq!(coerce_page(Some(&json!(-3))), 0);
        assert_eq!(coerce_page(Some(&json!(null))), 0);
        assert_eq!(coerce_page(None), 0);
    }

    #[test]
    fn float_metadata_renders_like_integers() {
        let assembled = assemble_context(&[hit(
            0.5,
            json!({"page": 3.0, "chunk_index": 11.0, "text": "t"}),
        )]);
        assert!(assembled.context.contains("| Page 3 | Chunk 11]"));
        assert_eq!(assembled.citations[0].page, 3);
    }

    #[test]
    fn no_matches_means_empty_context() {
        let assembled = assemble_context(&[]);
        assert!(assembled.context.is_empty());
        assert!(assembled.citations.is_empty());
    }
}
