use crate::domain::{Document, ScoredDocument};

const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Join matched documents into one grounding block, best match first.
///
/// An empty retrieval yields an empty string; callers must treat that as
/// "no grounding available" and never invent product facts.
pub fn assemble_context(retrieval: &[ScoredDocument]) -> String {
    retrieval
        .iter()
        .map(|scored| scored.document().content())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

/// Same as [`assemble_context`] for unranked documents, kept in the given order.
pub fn assemble_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(Document::content)
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(content: &str, similarity: f32) -> ScoredDocument {
        ScoredDocument::new(Document::new(content, content), similarity)
    }

    #[test]
    fn joins_with_blank_line_in_given_order() {
        let retrieval = vec![scored("Product: A", 0.93), scored("Product: B", 0.81)];

        assert_eq!(assemble_context(&retrieval), "Product: A\n\nProduct: B");
    }

    #[test]
    fn empty_retrieval_is_empty_context() {
        assert_eq!(assemble_context(&[]), "");
        assert_eq!(assemble_documents(&[]), "");
    }

    #[test]
    fn single_document_has_no_separator() {
        assert_eq!(assemble_context(&[scored("Product: A", 0.9)]), "Product: A");
    }
}
