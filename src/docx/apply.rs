use crate::container::xml::XmlPart;
use crate::error::PipelineError;
use crate::ir::{TextUnit, TranslationResult, UnitLocation};

/// Write translations back into the main document part.
///
/// A paragraph's text lives across one or more runs (style boundaries such
/// as a bolded span). The whole translated string goes into the paragraph's
/// first text node and every later text node is cleared: collapsing to one
/// run cannot corrupt run splits, at the documented cost of intra-paragraph
/// style boundaries. Units without a translation are left untouched.
pub fn apply_units<'a>(
    part: &mut XmlPart,
    units: impl IntoIterator<Item = &'a TextUnit>,
    result: &TranslationResult,
) -> Result<(), PipelineError> {
    for unit in units {
        let translated = match result.get(unit.sequence_index) {
            Some(t) => t,
            None => continue,
        };
        let para = match &unit.location {
            UnitLocation::Paragraph(p) => p,
            UnitLocation::Cell(c) => {
                return Err(PipelineError::Rewrite(format!(
                    "cell location {} in a docx rewrite",
                    c.cell_ref
                )))
            }
        };
        for (i, (&text_idx, &elem_idx)) in
            para.text_events.iter().zip(&para.text_elems).enumerate()
        {
            let new_text = if i == 0 { translated } else { "" };
            part.set_text(text_idx, new_text)?;
            if i == 0 && (new_text.starts_with(' ') || new_text.ends_with(' ')) {
                // Word drops unmarked edge whitespace in run text.
                part.set_attr(elem_idx, "xml:space", "preserve")?;
            }
        }
    }
    Ok(())
}
