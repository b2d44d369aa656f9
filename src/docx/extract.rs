use crate::container::xml::{XmlEvent, XmlPart};
use crate::ir::{ParagraphRef, TextUnit, UnitLocation};

/// Walk the main document part and yield one unit per `<w:p>` paragraph
/// whose trimmed text is non-empty. All `<w:t>` runs of a paragraph are
/// concatenated in reading order into a single source text; the run
/// boundaries themselves are recorded so the rewriter can collapse them.
///
/// Read-only and deterministic: extracting twice from the same part yields
/// identical sequences.
pub fn extract_units(part: &XmlPart, seq_start: usize) -> Vec<TextUnit> {
    let mut units: Vec<TextUnit> = Vec::new();

    let mut in_paragraph = false;
    let mut in_text_elem: Option<usize> = None;
    let mut para_text = String::new();
    let mut text_events: Vec<usize> = Vec::new();
    let mut text_elems: Vec<usize> = Vec::new();

    for (idx, ev) in part.events.iter().enumerate() {
        match ev {
            XmlEvent::Start { name, .. } => match name.as_str() {
                // WordprocessingML paragraphs do not nest.
                "w:p" => {
                    in_paragraph = true;
                    para_text.clear();
                    text_events.clear();
                    text_elems.clear();
                }
                "w:t" if in_paragraph => in_text_elem = Some(idx),
                _ => {}
            },
            XmlEvent::End { name } => match name.as_str() {
                "w:p" if in_paragraph => {
                    in_paragraph = false;
                    let trimmed = para_text.trim();
                    if !trimmed.is_empty() {
                        units.push(TextUnit {
                            location: UnitLocation::Paragraph(ParagraphRef {
                                text_events: text_events.clone(),
                                text_elems: text_elems.clone(),
                            }),
                            source_text: trimmed.to_string(),
                            sequence_index: seq_start + units.len(),
                        });
                    }
                }
                "w:t" => in_text_elem = None,
                _ => {}
            },
            XmlEvent::Text { text } => {
                if let Some(elem_idx) = in_text_elem {
                    para_text.push_str(text);
                    text_events.push(idx);
                    text_elems.push(elem_idx);
                }
            }
            _ => {}
        }
    }

    units
}

#[cfg(test)]
mod tests {
    use super::extract_units;
    use crate::container::xml::XmlPart;
    use crate::ir::UnitLocation;

    fn parse(xml: &str) -> XmlPart {
        XmlPart::parse("word/document.xml", xml.as_bytes()).expect("parse")
    }

    #[test]
    fn concatenates_runs_within_a_paragraph() {
        let part = parse(
            r#"<w:document xmlns:w="ns"><w:body>
            <w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>world</w:t></w:r></w:p>
            </w:body></w:document>"#,
        );
        let units = extract_units(&part, 0);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].source_text, "Hello world");
        assert_eq!(units[0].sequence_index, 0);
        match &units[0].location {
            UnitLocation::Paragraph(p) => assert_eq!(p.text_events.len(), 2),
            other => panic!("unexpected location: {other:?}"),
        }
    }

    #[test]
    fn skips_paragraphs_with_no_text() {
        let part = parse(
            r#"<w:document xmlns:w="ns"><w:body>
            <w:p><w:pPr><w:jc w:val="center"/></w:pPr></w:p>
            <w:p><w:r><w:t>   </w:t></w:r></w:p>
            <w:p><w:r><w:t>real</w:t></w:r></w:p>
            </w:body></w:document>"#,
        );
        let units = extract_units(&part, 0);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].source_text, "real");
    }

    #[test]
    fn keeps_document_order_including_table_paragraphs() {
        let part = parse(
            r#"<w:document xmlns:w="ns"><w:body>
            <w:p><w:r><w:t>first</w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>in table</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
            <w:p><w:r><w:t>last</w:t></w:r></w:p>
            </w:body></w:document>"#,
        );
        let units = extract_units(&part, 0);
        let texts: Vec<&str> = units.iter().map(|u| u.source_text.as_str()).collect();
        assert_eq!(texts, vec!["first", "in table", "last"]);
        assert_eq!(
            units.iter().map(|u| u.sequence_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let part = parse(
            r#"<w:document xmlns:w="ns"><w:body>
            <w:p><w:r><w:t>one</w:t></w:r></w:p>
            <w:p><w:r><w:t>two</w:t></w:r></w:p>
            </w:body></w:document>"#,
        );
        let a = extract_units(&part, 0);
        let b = extract_units(&part, 0);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.source_text, y.source_text);
            assert_eq!(x.sequence_index, y.sequence_index);
        }
    }
}
