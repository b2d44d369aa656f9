use crate::client::{TextDomain, TranslationClient};
use crate::ir::{Chunk, TranslationResult};
use crate::progress::ConsoleProgress;

/// Drives chunks through the translation client, strictly in order, and
/// degrades chunk-level failures to unit-by-unit retries.
///
/// A batch call can fail for reasons that poison the whole reply (one bad
/// element breaking JSON parsing, a transient rate limit); discarding a full
/// chunk over one bad unit is not acceptable, so each unit of a failed chunk
/// is retried once as a one-element batch. A unit failing even there is
/// simply left out of the result and keeps its source text at apply time.
pub struct ChunkExecutor<'a> {
    client: &'a dyn TranslationClient,
    progress: &'a ConsoleProgress,
    domain: TextDomain,
}

impl<'a> ChunkExecutor<'a> {
    pub fn new(
        client: &'a dyn TranslationClient,
        progress: &'a ConsoleProgress,
        domain: TextDomain,
    ) -> Self {
        Self {
            client,
            progress,
            domain,
        }
    }

    pub fn run(&self, chunks: &[Chunk], target_lang: &str) -> TranslationResult {
        let mut result = TranslationResult::default();
        let total = chunks.len();

        for (chunk_idx, chunk) in chunks.iter().enumerate() {
            self.progress.progress("translate chunk", chunk_idx + 1, total);
            let texts: Vec<String> = chunk
                .units
                .iter()
                .map(|u| u.source_text.clone())
                .collect();

            match self.client.translate_batch(&texts, target_lang, self.domain) {
                Ok(translated) => {
                    for (unit, text) in chunk.units.iter().zip(translated) {
                        if !text.is_empty() {
                            result.insert(unit.sequence_index, text);
                        }
                    }
                }
                Err(err) => {
                    self.progress.info(format!(
                        "chunk {}/{total} failed ({err}); retrying {} units individually",
                        chunk_idx + 1,
                        chunk.units.len()
                    ));
                    self.retry_units_individually(chunk, target_lang, &mut result);
                }
            }
        }

        result
    }

    fn retry_units_individually(
        &self,
        chunk: &Chunk,
        target_lang: &str,
        result: &mut TranslationResult,
    ) {
        for unit in &chunk.units {
            match self
                .client
                .translate_one(&unit.source_text, target_lang, self.domain)
            {
                Ok(text) if !text.is_empty() => {
                    result.insert(unit.sequence_index, text);
                }
                Ok(_) => result.failed_units += 1,
                Err(err) => {
                    self.progress.info(format!(
                        "unit {} kept verbatim ({err})",
                        unit.sequence_index
                    ));
                    result.failed_units += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkExecutor;
    use crate::client::{TextDomain, TranslationClient};
    use crate::error::ClientError;
    use crate::ir::{Chunk, ParagraphRef, TextUnit, UnitLocation};
    use crate::progress::ConsoleProgress;
    use std::cell::RefCell;

    fn unit(seq: usize, text: &str) -> TextUnit {
        TextUnit {
            location: UnitLocation::Paragraph(ParagraphRef {
                text_events: vec![],
                text_elems: vec![],
            }),
            source_text: text.to_string(),
            sequence_index: seq,
        }
    }

    fn chunk(units: Vec<TextUnit>) -> Chunk {
        Chunk {
            estimated_tokens: units.len(),
            units,
        }
    }

    /// Scripted client: batch calls of more than one element fail when
    /// `fail_batches` is set; singleton calls fail for texts listed in
    /// `fail_texts`. Successful calls upper-case the input.
    struct ScriptedClient {
        fail_batches: bool,
        fail_texts: Vec<String>,
        calls: RefCell<Vec<usize>>,
    }

    impl ScriptedClient {
        fn new(fail_batches: bool, fail_texts: &[&str]) -> Self {
            Self {
                fail_batches,
                fail_texts: fail_texts.iter().map(|s| s.to_string()).collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl TranslationClient for ScriptedClient {
        fn translate_batch(
            &self,
            texts: &[String],
            _target_lang: &str,
            _domain: TextDomain,
        ) -> Result<Vec<String>, ClientError> {
            self.calls.borrow_mut().push(texts.len());
            if self.fail_batches && texts.len() > 1 {
                return Err(ClientError::MalformedResponse("scripted".to_string()));
            }
            if texts.iter().any(|t| self.fail_texts.contains(t)) {
                return Err(ClientError::Request("scripted outage".to_string()));
            }
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    #[test]
    fn successful_batch_maps_by_sequence_index() {
        let client = ScriptedClient::new(false, &[]);
        let progress = ConsoleProgress::new(false);
        let executor = ChunkExecutor::new(&client, &progress, TextDomain::Paragraphs);
        let chunks = vec![chunk(vec![unit(0, "aa"), unit(1, "bb")])];

        let result = executor.run(&chunks, "ko");
        assert_eq!(result.get(0), Some("AA"));
        assert_eq!(result.get(1), Some("BB"));
        assert_eq!(result.failed_units, 0);
    }

    #[test]
    fn failed_batch_degrades_to_singletons_with_isolation() {
        // Batch of 3 fails; units 0 and 2 recover individually, unit 1 fails
        // even as a singleton and is omitted from the result.
        let client = ScriptedClient::new(true, &["bad"]);
        let progress = ConsoleProgress::new(false);
        let executor = ChunkExecutor::new(&client, &progress, TextDomain::Paragraphs);
        let chunks = vec![chunk(vec![unit(0, "aa"), unit(1, "bad"), unit(2, "cc")])];

        let result = executor.run(&chunks, "ko");
        assert_eq!(result.get(0), Some("AA"));
        assert_eq!(result.get(1), None);
        assert_eq!(result.get(2), Some("CC"));
        assert_eq!(result.failed_units, 1);
        assert_eq!(*client.calls.borrow(), vec![3, 1, 1, 1]);
    }

    #[test]
    fn total_outage_leaves_every_unit_untranslated() {
        let client = ScriptedClient::new(true, &["aa", "bb"]);
        let progress = ConsoleProgress::new(false);
        let executor = ChunkExecutor::new(&client, &progress, TextDomain::Paragraphs);
        let chunks = vec![chunk(vec![unit(0, "aa"), unit(1, "bb")])];

        let result = executor.run(&chunks, "ko");
        assert!(result.is_empty());
        assert_eq!(result.failed_units, 2);
    }

    #[test]
    fn later_chunks_still_run_after_a_failing_chunk() {
        let client = ScriptedClient::new(true, &["bad"]);
        let progress = ConsoleProgress::new(false);
        let executor = ChunkExecutor::new(&client, &progress, TextDomain::Cells);
        let chunks = vec![
            chunk(vec![unit(0, "bad"), unit(1, "ok")]),
            chunk(vec![unit(2, "later")]),
        ];

        let result = executor.run(&chunks, "ja");
        assert_eq!(result.get(1), Some("OK"));
        assert_eq!(result.get(2), Some("LATER"));
        assert_eq!(result.failed_units, 1);
    }

    #[test]
    fn empty_translation_counts_as_miss() {
        struct EmptyClient;
        impl TranslationClient for EmptyClient {
            fn translate_batch(
                &self,
                texts: &[String],
                _target_lang: &str,
                _domain: TextDomain,
            ) -> Result<Vec<String>, ClientError> {
                Ok(vec![String::new(); texts.len()])
            }
        }
        let client = EmptyClient;
        let progress = ConsoleProgress::new(false);
        let executor = ChunkExecutor::new(&client, &progress, TextDomain::Paragraphs);
        let chunks = vec![chunk(vec![unit(0, "aa")])];

        let result = executor.run(&chunks, "ko");
        assert_eq!(result.get(0), None);
    }
}
