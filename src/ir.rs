/// One addressable, atomically-translated piece of text.
///
/// Units are created once during extraction, stay read-only afterward, and
/// are consumed by the rewriter exactly once. `source_text` is never empty:
/// units with no text are not extracted.
#[derive(Clone, Debug)]
pub struct TextUnit {
    pub location: UnitLocation,
    pub source_text: String,
    /// Position in the overall extraction order; translations are
    /// re-associated with units through this index after a chunk round-trip.
    pub sequence_index: usize,
}

/// Handle back into the in-memory document model, recorded at extraction
/// time so the rewriter can write without re-walking the document.
#[derive(Clone, Debug)]
pub enum UnitLocation {
    Paragraph(ParagraphRef),
    Cell(CellRef),
}

/// A `<w:p>` paragraph in the main document part.
///
/// `text_events` are the indices of the Text events inside the paragraph's
/// `<w:t>` elements, in reading order; `text_elems` are the indices of the
/// corresponding `<w:t>` Start events (needed for `xml:space` fix-ups).
#[derive(Clone, Debug)]
pub struct ParagraphRef {
    pub text_events: Vec<usize>,
    pub text_elems: Vec<usize>,
}

/// A single cell in a worksheet part.
#[derive(Clone, Debug)]
pub struct CellRef {
    /// Index into the workbook's ordered sheet list.
    pub sheet_index: usize,
    /// Sheet display name from `xl/workbook.xml`.
    pub sheet_name: String,
    /// A1-style cell reference.
    pub cell_ref: String,
    pub kind: CellTextKind,
}

#[derive(Clone, Debug)]
pub enum CellTextKind {
    /// `t="s"` cell: the Text event of its `<v>` holds a shared-string
    /// table index.
    Shared { value_event: usize },
    /// `t="inlineStr"` cell: Text events of the `<t>` elements under `<is>`,
    /// plus their Start events for `xml:space` fix-ups.
    Inline {
        text_events: Vec<usize>,
        text_elems: Vec<usize>,
    },
}

/// An ordered, contiguous sub-sequence of units assigned to one LLM call.
///
/// `estimated_tokens` stays within the planner's budget except for singleton
/// chunks holding one oversized unit.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub units: Vec<TextUnit>,
    pub estimated_tokens: usize,
}

/// Mapping from `sequence_index` to translated text, covering only units
/// that translated successfully. A unit with no entry keeps its source text
/// when applied.
#[derive(Debug, Default)]
pub struct TranslationResult {
    translated: std::collections::HashMap<usize, String>,
    /// Units that failed even the individual fallback, kept for logging.
    pub failed_units: usize,
}

impl TranslationResult {
    pub fn insert(&mut self, sequence_index: usize, text: String) {
        self.translated.insert(sequence_index, text);
    }

    pub fn get(&self, sequence_index: usize) -> Option<&str> {
        self.translated.get(&sequence_index).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.translated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translated.is_empty()
    }
}
