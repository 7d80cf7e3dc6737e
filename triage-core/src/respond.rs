//! Deterministic answer synthesis over retrieved documentation chunks.
//!
//! No generative model is involved here: the answer is assembled entirely
//! from retrieved excerpts with a fixed template, so the same retrieval
//! results always produce the same text and nothing can be hallucinated.

use serde::{Deserialize, Serialize};

use crate::index::ScoredChunk;

/// Excerpts are truncated to this many characters before templating.
const EXCERPT_MAX_CHARS: usize = 260;

/// How many retrieved chunks appear as numbered recommendations.
const DIGEST_SIZE: usize = 3;

/// One citation backing a synthesized answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    pub score: f32,
    pub excerpt: String,
}

fn make_excerpt(text: &str) -> String {
    text.chars()
        .take(EXCERPT_MAX_CHARS)
        .collect::<String>()
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// Build an answer and its citations from the retrieval results.
///
/// Citations cover every retrieved chunk in rank order; the answer body
/// digests only the top three. With no results, a fixed guidance message
/// is returned with an empty citation list.
pub fn synthesize(_ticket_text: &str, retrieved: &[ScoredChunk]) -> (String, Vec<Citation>) {
    let citations: Vec<Citation> = retrieved
        .iter()
        .map(|scored| Citation {
            doc_id: scored.chunk.doc_id.clone(),
            score: scored.score,
            excerpt: make_excerpt(&scored.chunk.text),
        })
        .collect();

    if citations.is_empty() {
        let answer = "I couldn't find a relevant article in the indexed docs for this ticket. \
                      Try refining the query or ingest more documentation. \
                      Meanwhile, gather logs, reproduction steps, and confirm impacted users."
            .to_string();
        return (answer, citations);
    }

    let mut lines = vec![
        "Suggested approach based on documentation snippets:".to_string(),
        String::new(),
    ];
    for (i, citation) in citations.iter().take(DIGEST_SIZE).enumerate() {
        lines.push(format!(
            "{}. Refer to **{}** (score={:.3}).",
            i + 1,
            citation.doc_id,
            citation.score
        ));
        lines.push(format!("   Excerpt: {}", citation.excerpt));
    }
    lines.push(String::new());
    lines.push("Next steps:".to_string());
    lines.push("- Confirm scope/impact and gather exact error messages.".to_string());
    lines.push("- Validate configuration and policy order relevant to the product area.".to_string());
    lines.push("- If still blocked, escalate with logs and connector/proxy status details.".to_string());

    (lines.join("\n"), citations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_context::DocChunk;

    fn scored(doc_id: &str, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: DocChunk {
                doc_id: doc_id.to_string(),
                text: text.to_string(),
            },
            score,
        }
    }

    #[test]
    fn empty_retrieval_yields_guidance_and_no_citations() {
        let (answer, citations) = synthesize("anything", &[]);
        assert!(answer.contains("couldn't find a relevant article"));
        assert!(citations.is_empty());
    }

    #[test]
    fn answer_digests_top_three_but_cites_all() {
        let retrieved = vec![
            scored("a.md#chunk0", "first", 0.9),
            scored("b.md#chunk0", "second", 0.8),
            scored("c.md#chunk0", "third", 0.7),
            scored("d.md#chunk0", "fourth", 0.6),
        ];
        let (answer, citations) = synthesize("anything", &retrieved);

        assert_eq!(citations.len(), 4);
        assert!(answer.contains("1. Refer to **a.md#chunk0** (score=0.900)."));
        assert!(answer.contains("2. Refer to **b.md#chunk0** (score=0.800)."));
        assert!(answer.contains("3. Refer to **c.md#chunk0** (score=0.700)."));
        assert!(!answer.contains("d.md#chunk0"));
        assert!(answer.contains("Next steps:"));
    }

    #[test]
    fn excerpts_are_truncated_and_flattened() {
        let long_text = format!("line one\nline two\n{}", "x".repeat(300));
        let retrieved = vec![scored("doc.md#chunk0", &long_text, 0.5)];
        let (_, citations) = synthesize("anything", &retrieved);

        let excerpt = &citations[0].excerpt;
        assert!(excerpt.chars().count() <= 260);
        assert!(!excerpt.contains('\n'));
        assert!(excerpt.starts_with("line one line two"));
    }

    #[test]
    fn excerpt_truncation_respects_char_boundaries() {
        let text = "é".repeat(300);
        let retrieved = vec![scored("doc.md#chunk0", &text, 0.5)];
        let (_, citations) = synthesize("anything", &retrieved);
        assert_eq!(citations[0].excerpt.chars().count(), 260);
    }

    #[test]
    fn same_input_same_output() {
        let retrieved = vec![
            scored("a.md#chunk0", "alpha", 0.9),
            scored("b.md#chunk0", "beta", 0.8),
        ];
        let first = synthesize("ticket", &retrieved);
        let second = synthesize("ticket", &retrieved);
        assert_eq!(first, second);
    }
}
