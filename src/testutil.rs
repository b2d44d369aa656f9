//! In-memory container fixtures for tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();
    for (name, data) in entries {
        zw.start_file(*name, opts).expect("start zip entry");
        zw.write_all(data.as_bytes()).expect("write zip entry");
    }
    zw.finish().expect("finish zip").into_inner()
}

/// A docx container with the given `<w:body>` content and a styles part
/// that must survive translation byte-for-byte.
pub fn docx_with_body(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    zip_bytes(&[
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#,
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="officeDocument" Target="word/document.xml"/></Relationships>"#,
        ),
        ("word/document.xml", &document),
        (
            "word/styles.xml",
            r#"<?xml version="1.0"?><w:styles xmlns:w="wp-ns"><w:style w:styleId="Normal"/></w:styles>"#,
        ),
    ])
}

/// An xlsx container with one sheet named "Data": A1 is the shared string
/// "Name", B1 is the number 42, A2 is an inline string "inline text".
pub fn simple_xlsx() -> Vec<u8> {
    xlsx_with(
        r#"<sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>42</v></c></row><row r="2"><c r="A2" t="inlineStr"><is><t>inline text</t></is></c></row></sheetData>"#,
        Some(r#"<sst count="1" uniqueCount="1"><si><t>Name</t></si></sst>"#),
    )
}

/// An xlsx container with one sheet named "Data" and the given
/// `<sheetData>` markup; `shared` supplies the `<sst>` body when present.
pub fn xlsx_with(sheet_data: &str, shared: Option<&str>) -> Vec<u8> {
    let sheet = format!(r#"<?xml version="1.0"?><worksheet>{sheet_data}</worksheet>"#);
    let shared_doc = shared.map(|sst| format!(r#"<?xml version="1.0"?>{sst}"#));
    let mut entries: Vec<(&str, &str)> = vec![
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0"?><workbook xmlns:r="rel-ns"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0"?><Relationships><Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
        ),
        ("xl/worksheets/sheet1.xml", &sheet),
    ];
    if let Some(doc) = shared_doc.as_deref() {
        entries.push(("xl/sharedStrings.xml", doc));
    }
    zip_bytes(&entries)
}
