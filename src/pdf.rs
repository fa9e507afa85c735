use anyhow::{Context, Result, ensure};
use itertools::Itertools;

/// Extracts the text of a PDF document and cuts it into overlapping
/// windows of `size` words.
pub async fn chunks_from_bytes(bytes: Vec<u8>, size: usize, overlap: usize) -> Result<Vec<String>> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .context("PDF extraction task failed")?
        .context("Error processing PDF")?;

    let chunks = chunk_words(&text, size, overlap);
    ensure!(!chunks.is_empty(), "PDF contains no extractable text");

    tracing::info!(sections = chunks.len(), "Extracted PDF text");
    Ok(chunks)
}

/// Windows of `size` words, each sharing its first `overlap` words with
/// the end of the previous one.
pub fn chunk_words(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].iter().join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
pub(crate) const SAMPLE_PDF: &[u8] = include_bytes!("../testdata/attention.pdf");
