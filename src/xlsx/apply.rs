use std::collections::{BTreeSet, HashMap};

use crate::container::xml::XmlEvent;
use crate::error::PipelineError;
use crate::ir::{CellTextKind, TextUnit, TranslationResult, UnitLocation};

use super::workbook::Workbook;

/// Which parts the rewrite touched, so the serializer replaces only those.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub changed_sheets: BTreeSet<usize>,
    pub shared_changed: bool,
}

/// Write translations back into the workbook.
///
/// A shared-string entry may be referenced by several cells, and sibling
/// cells keep their own translation state, so translated cells are
/// repointed at entries appended to the table instead of editing shared
/// entries in place. Appending also keeps every recorded event index valid.
/// Inline-string cells take the whole translation in their first text node,
/// like docx runs. Units without a translation stay untouched.
pub fn apply_units<'a>(
    workbook: &mut Workbook,
    units: impl IntoIterator<Item = &'a TextUnit>,
    result: &TranslationResult,
) -> Result<ApplyOutcome, PipelineError> {
    let mut outcome = ApplyOutcome::default();
    let base = workbook.shared.strings.len();
    let mut appended: Vec<String> = Vec::new();
    let mut appended_index: HashMap<String, usize> = HashMap::new();

    for unit in units {
        let translated = match result.get(unit.sequence_index) {
            Some(t) => t,
            None => continue,
        };
        let cell = match &unit.location {
            UnitLocation::Cell(c) => c,
            UnitLocation::Paragraph(_) => {
                return Err(PipelineError::Rewrite(
                    "paragraph location in a workbook rewrite".to_string(),
                ))
            }
        };
        let sheet = workbook.sheets.get_mut(cell.sheet_index).ok_or_else(|| {
            PipelineError::Rewrite(format!("sheet index {} out of range", cell.sheet_index))
        })?;

        match &cell.kind {
            CellTextKind::Shared { value_event } => {
                let index = *appended_index.entry(translated.to_string()).or_insert_with(|| {
                    appended.push(translated.to_string());
                    base + appended.len() - 1
                });
                sheet.part.set_text(*value_event, &index.to_string())?;
            }
            CellTextKind::Inline {
                text_events,
                text_elems,
            } => {
                for (i, (&text_idx, &elem_idx)) in
                    text_events.iter().zip(text_elems).enumerate()
                {
                    let new_text = if i == 0 { translated } else { "" };
                    sheet.part.set_text(text_idx, new_text)?;
                    if i == 0
                        && (new_text.starts_with(' ') || new_text.ends_with(' '))
                    {
                        sheet.part.set_attr(elem_idx, "xml:space", "preserve")?;
                    }
                }
            }
        }
        outcome.changed_sheets.insert(cell.sheet_index);
    }

    if !appended.is_empty() {
        append_shared_entries(workbook, &appended)?;
        outcome.shared_changed = true;
    }
    Ok(outcome)
}

fn append_shared_entries(
    workbook: &mut Workbook,
    appended: &[String],
) -> Result<(), PipelineError> {
    let unique_count = (workbook.shared.strings.len() + appended.len()).to_string();
    let part = workbook.shared.part.as_mut().ok_or_else(|| {
        PipelineError::Rewrite("shared-string cell without a shared-strings part".to_string())
    })?;

    let close_at = part
        .events
        .iter()
        .rposition(|ev| matches!(ev, XmlEvent::End { name } if name == "sst"))
        .ok_or_else(|| PipelineError::Rewrite("shared-strings part has no <sst>".to_string()))?;

    let mut new_events = Vec::with_capacity(appended.len() * 5);
    for text in appended {
        let mut t_attrs = Vec::new();
        if text.starts_with(' ') || text.ends_with(' ') {
            t_attrs.push(("xml:space".to_string(), "preserve".to_string()));
        }
        new_events.push(XmlEvent::Start {
            name: "si".to_string(),
            attrs: Vec::new(),
        });
        new_events.push(XmlEvent::Start {
            name: "t".to_string(),
            attrs: t_attrs,
        });
        new_events.push(XmlEvent::Text { text: text.clone() });
        new_events.push(XmlEvent::End {
            name: "t".to_string(),
        });
        new_events.push(XmlEvent::End {
            name: "si".to_string(),
        });
    }
    part.events.splice(close_at..close_at, new_events);

    for ev in part.events.iter_mut() {
        if let XmlEvent::Start { name, attrs } = ev {
            if name == "sst" {
                for (k, v) in attrs.iter_mut() {
                    if k == "uniqueCount" {
                        *v = unique_count.clone();
                    }
                }
                break;
            }
        }
    }

    workbook.shared.strings.extend(appended.iter().cloned());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::apply_units;
    use crate::container::package::ContainerPackage;
    use crate::ir::TranslationResult;
    use crate::testutil::{simple_xlsx, xlsx_with};
    use crate::xlsx::extract::extract_units;
    use crate::xlsx::workbook::Workbook;

    fn workbook_from(buf: &[u8]) -> Workbook {
        let pkg = ContainerPackage::from_bytes(buf).expect("package");
        Workbook::parse(&pkg).expect("workbook")
    }

    #[test]
    fn shared_cell_points_at_appended_entry() {
        let mut wb = workbook_from(&simple_xlsx());
        let units = extract_units(&wb, 0);
        let mut result = TranslationResult::default();
        result.insert(0, "이름".to_string());

        apply_units(&mut wb, &units, &result).expect("apply");

        let sheet_xml =
            String::from_utf8(wb.sheets[0].part.to_bytes()).expect("utf8");
        assert!(sheet_xml.contains(r#"<c r="A1" t="s"><v>1</v></c>"#));
        // Numeric neighbor untouched.
        assert!(sheet_xml.contains(r#"<c r="B1"><v>42</v></c>"#));

        let sst_xml = String::from_utf8(
            wb.shared.part.as_ref().expect("sst").to_bytes(),
        )
        .expect("utf8");
        assert!(sst_xml.contains("<si><t>Name</t></si>"));
        assert!(sst_xml.contains("<si><t>이름</t></si>"));
        assert!(sst_xml.contains(r#"uniqueCount="2""#));
    }

    #[test]
    fn sibling_cells_sharing_an_entry_stay_independent() {
        let mut wb = workbook_from(&xlsx_with(
            r#"<sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>0</v></c></row></sheetData>"#,
            Some(r#"<sst count="2" uniqueCount="1"><si><t>Total</t></si></sst>"#),
        ));
        let units = extract_units(&wb, 0);
        assert_eq!(units.len(), 2);
        // Only A1 translates; B1 failed and keeps the original entry.
        let mut result = TranslationResult::default();
        result.insert(0, "합계".to_string());

        apply_units(&mut wb, &units, &result).expect("apply");
        let sheet_xml =
            String::from_utf8(wb.sheets[0].part.to_bytes()).expect("utf8");
        assert!(sheet_xml.contains(r#"<c r="A1" t="s"><v>1</v></c>"#));
        assert!(sheet_xml.contains(r#"<c r="B1" t="s"><v>0</v></c>"#));
    }

    #[test]
    fn identical_translations_reuse_one_appended_entry() {
        let mut wb = workbook_from(&xlsx_with(
            r#"<sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row></sheetData>"#,
            Some(r#"<sst uniqueCount="2"><si><t>Sum</t></si><si><t>Summe</t></si></sst>"#),
        ));
        let units = extract_units(&wb, 0);
        let mut result = TranslationResult::default();
        result.insert(0, "합계".to_string());
        result.insert(1, "합계".to_string());

        apply_units(&mut wb, &units, &result).expect("apply");
        let sheet_xml =
            String::from_utf8(wb.sheets[0].part.to_bytes()).expect("utf8");
        assert!(sheet_xml.contains(r#"<c r="A1" t="s"><v>2</v></c>"#));
        assert!(sheet_xml.contains(r#"<c r="B1" t="s"><v>2</v></c>"#));
        assert_eq!(wb.shared.strings.len(), 3);
    }

    #[test]
    fn inline_string_collapses_to_first_text_node() {
        let mut wb = workbook_from(&xlsx_with(
            r#"<sheetData><row r="1"><c r="A1" t="inlineStr"><is><r><t>in</t></r><r><t>line</t></r></is></c></row></sheetData>"#,
            None,
        ));
        let units = extract_units(&wb, 0);
        assert_eq!(units[0].source_text, "inline");
        let mut result = TranslationResult::default();
        result.insert(0, "번역".to_string());

        let outcome = apply_units(&mut wb, &units, &result).expect("apply");
        assert!(!outcome.shared_changed);
        let sheet_xml =
            String::from_utf8(wb.sheets[0].part.to_bytes()).expect("utf8");
        assert!(sheet_xml.contains("<t>번역</t>"));
        assert!(sheet_xml.contains("<t></t>"));
    }
}
