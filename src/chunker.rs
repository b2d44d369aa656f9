use crate::ir::{Chunk, TextUnit};
use crate::textutil::estimate_tokens;

/// Group units into chunks bounded by `token_budget`, preserving extraction
/// order within and across chunks. A unit is never split; a unit whose own
/// estimate exceeds the budget becomes a singleton chunk instead of being
/// dropped or truncated.
pub fn plan_chunks(units: Vec<TextUnit>, token_budget: usize) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<TextUnit> = Vec::new();
    let mut current_tokens = 0usize;

    for unit in units {
        let unit_tokens = estimate_tokens(&unit.source_text);

        if unit_tokens > token_budget {
            if !current.is_empty() {
                chunks.push(Chunk {
                    units: std::mem::take(&mut current),
                    estimated_tokens: current_tokens,
                });
                current_tokens = 0;
            }
            chunks.push(Chunk {
                units: vec![unit],
                estimated_tokens: unit_tokens,
            });
            continue;
        }

        if current_tokens + unit_tokens > token_budget && !current.is_empty() {
            chunks.push(Chunk {
                units: std::mem::take(&mut current),
                estimated_tokens: current_tokens,
            });
            current_tokens = 0;
        }
        current_tokens += unit_tokens;
        current.push(unit);
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            units: current,
            estimated_tokens: current_tokens,
        });
    }
    chunks
}
