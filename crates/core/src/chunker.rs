use crate::error::CoreError;

/// A contiguous span of a source document. `start` is a char offset into the
/// trimmed document; chunks exist only for the duration of one analysis call.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub start: usize,
    pub text: String,
}

/// Split a document into overlapping windows of `chunk_size` chars.
///
/// The window advances by `chunk_size - overlap` each step, so consecutive
/// chunks share exactly `overlap` chars; the final chunk may be shorter but is
/// never empty. Offsets are char-based so multi-byte UTF-8 never splits.
pub fn chunk(document: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, CoreError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(CoreError::InvalidChunking {
            chunk_size,
            overlap,
        });
    }

    let trimmed = document.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= chunk_size {
        return Ok(vec![Chunk {
            start: 0,
            text: trimmed.to_string(),
        }]);
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(Chunk {
            start,
            text: chars[start..end].iter().collect(),
        });
        if end == chars.len() {
            break;
        }
        start += step;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_and_overlap_are_exact() {
        let doc: String = std::iter::repeat("abcdefghij").take(35).collect();
        let chunks = chunk(&doc, 100, 20).unwrap();

        for c in &chunks[..chunks.len() - 1] {
            assert_eq!(c.text.chars().count(), 100);
        }
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().skip(80).collect();
            let head: String = pair[1].text.chars().take(20).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn reconstruction_without_overlap_yields_original() {
        let doc = "The quick brown fox jumps over the lazy dog. ".repeat(12);
        let doc = doc.trim().to_string();
        let chunks = chunk(&doc, 100, 20).unwrap();

        let mut rebuilt: String = chunks[0].text.clone();
        for c in &chunks[1..] {
            rebuilt.extend(c.text.chars().skip(20));
        }
        assert_eq!(rebuilt, doc);
    }

    #[test]
    fn short_document_is_single_trimmed_chunk() {
        let chunks = chunk("  short policy  ", 100, 20).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short policy");
        assert_eq!(chunks[0].start, 0);
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        assert!(chunk("   \n\t  ", 100, 20).unwrap().is_empty());
        assert!(chunk("", 100, 20).unwrap().is_empty());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            chunk("text", 0, 0),
            Err(CoreError::InvalidChunking { .. })
        ));
        assert!(matches!(
            chunk("text", 10, 10),
            Err(CoreError::InvalidChunking { .. })
        ));
        assert!(matches!(
            chunk("text", 10, 15),
            Err(CoreError::InvalidChunking { .. })
        ));
    }

    #[test]
    fn multibyte_text_never_splits_codepoints() {
        let doc = "política de segurança é obrigatória ".repeat(10);
        let chunks = chunk(&doc, 50, 10).unwrap();
        assert!(!chunks.is_empty());
        // Collecting from char slices cannot panic; verify coverage instead.
        let mut rebuilt: String = chunks[0].text.clone();
        for c in &chunks[1..] {
            rebuilt.extend(c.text.chars().skip(10));
        }
        assert_eq!(rebuilt, doc.trim());
    }
}
