use crate::container::xml::{XmlEvent, XmlPart};
use crate::ir::{CellRef, CellTextKind, TextUnit, UnitLocation};

use super::workbook::{find_attr, Sheet, Workbook};

/// Extract one unit per string-valued cell, in workbook order then document
/// order within each sheet. Only shared-string (`t="s"`) and inline-string
/// (`t="inlineStr"`) cells qualify: numeric, boolean, error and formula
/// cells carry data semantics a translation would corrupt.
pub fn extract_units(workbook: &Workbook, seq_start: usize) -> Vec<TextUnit> {
    let mut units = Vec::new();
    for (sheet_index, sheet) in workbook.sheets.iter().enumerate() {
        extract_sheet_units(
            sheet,
            sheet_index,
            &workbook.shared.strings,
            seq_start,
            &mut units,
        );
    }
    units
}

struct CellState {
    cell_ref: String,
    cell_type: Option<String>,
    has_formula: bool,
    value_event: Option<usize>,
    value_text: String,
    inline_text: String,
    inline_text_events: Vec<usize>,
    inline_text_elems: Vec<usize>,
}

fn extract_sheet_units(
    sheet: &Sheet,
    sheet_index: usize,
    shared_strings: &[String],
    seq_start: usize,
    units: &mut Vec<TextUnit>,
) {
    let mut cell: Option<CellState> = None;
    let mut in_value = false;
    let mut in_inline_text: Option<usize> = None;

    for (idx, ev) in sheet.part.events.iter().enumerate() {
        match ev {
            XmlEvent::Start { name, attrs } => match name.as_str() {
                "c" => {
                    cell = Some(CellState {
                        cell_ref: find_attr(attrs, "r").unwrap_or_default(),
                        cell_type: find_attr(attrs, "t"),
                        has_formula: false,
                        value_event: None,
                        value_text: String::new(),
                        inline_text: String::new(),
                        inline_text_events: Vec::new(),
                        inline_text_elems: Vec::new(),
                    });
                }
                "f" if cell.is_some() => {
                    if let Some(c) = cell.as_mut() {
                        c.has_formula = true;
                    }
                }
                "v" if cell.is_some() => in_value = true,
                "t" if cell.is_some() => in_inline_text = Some(idx),
                _ => {}
            },
            XmlEvent::Empty { name, .. } => {
                if name == "f" {
                    if let Some(c) = cell.as_mut() {
                        c.has_formula = true;
                    }
                }
            }
            XmlEvent::End { name } => match name.as_str() {
                "c" => {
                    if let Some(state) = cell.take() {
                        finalize_cell(state, sheet, sheet_index, shared_strings, seq_start, units);
                    }
                }
                "v" => in_value = false,
                "t" => in_inline_text = None,
                _ => {}
            },
            XmlEvent::Text { text } => {
                if let Some(c) = cell.as_mut() {
                    if in_value {
                        if c.value_event.is_none() {
                            c.value_event = Some(idx);
                        }
                        c.value_text.push_str(text);
                    } else if let Some(elem_idx) = in_inline_text {
                        c.inline_text.push_str(text);
                        c.inline_text_events.push(idx);
                        c.inline_text_elems.push(elem_idx);
                    }
                }
            }
            _ => {}
        }
    }
}

fn finalize_cell(
    state: CellState,
    sheet: &Sheet,
    sheet_index: usize,
    shared_strings: &[String],
    seq_start: usize,
    units: &mut Vec<TextUnit>,
) {
    if state.has_formula {
        return;
    }
    let (source_text, kind) = match state.cell_type.as_deref() {
        Some("s") => {
            let shared_index: usize = match state.value_text.trim().parse() {
                Ok(i) => i,
                Err(_) => return,
            };
            let text = match shared_strings.get(shared_index) {
                Some(t) => t.trim().to_string(),
                None => return,
            };
            let value_event = match state.value_event {
                Some(e) => e,
                None => return,
            };
            (text, CellTextKind::Shared { value_event })
        }
        Some("inlineStr") => (
            state.inline_text.trim().to_string(),
            CellTextKind::Inline {
                text_events: state.inline_text_events,
                text_elems: state.inline_text_elems,
            },
        ),
        // "str" is a formula's cached string result; numbers, booleans,
        // errors and dates are never translated.
        _ => return,
    };
    if source_text.is_empty() {
        return;
    }
    units.push(TextUnit {
        location: UnitLocation::Cell(CellRef {
            sheet_index,
            sheet_name: sheet.name.clone(),
            cell_ref: state.cell_ref,
            kind,
        }),
        source_text,
        sequence_index: seq_start + units.len(),
    });
}
