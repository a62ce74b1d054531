use crate::chunker::{chunk_text, ChunkRange, SizeSource};
use crate::oracle::{classify_chunk, Oracle, UsageContext};
use crate::types::{ChunkVerdict, Result};
use tracing::{debug, warn};

/// Verdicts gathered by one chunk-and-classify pass over a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub verdicts: Vec<ChunkVerdict>,
    /// Chunks the text was split into, classified or not.
    pub chunk_count: usize,
}

impl RoundResult {
    pub fn is_suspicious(&self) -> bool {
        self.verdicts.iter().any(|verdict| verdict.tag.is_suspicious())
    }
}

/// Chunk `text` and classify chunks in order, stopping at the first suspicious one.
///
/// Chunks after a SUS verdict are never sent to the oracle. Any oracle failure
/// aborts the round.
pub async fn run_round(
    oracle: &dyn Oracle,
    instruction: &str,
    text: &str,
    range: ChunkRange,
    usage: &mut UsageContext,
    sizes: &mut dyn SizeSource,
) -> Result<RoundResult> {
    let chunks = chunk_text(text, range, sizes);
    let mut verdicts = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.iter().enumerate() {
        let verdict = classify_chunk(oracle, usage, instruction, chunk).await?;
        let suspicious = verdict.tag.is_suspicious();
        verdicts.push(verdict);

        if suspicious {
            warn!("Chunk {}/{} flagged as suspicious, ending round early", index + 1, chunks.len());
            break;
        }
    }

    debug!("Round classified {} of {} chunks", verdicts.len(), chunks.len());
    Ok(RoundResult {
        verdicts,
        chunk_count: chunks.len(),
    })
}
