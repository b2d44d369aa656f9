use std::collections::HashMap;

use crate::container::package::ContainerPackage;
use crate::container::xml::{XmlEvent, XmlPart};
use crate::error::PipelineError;

use super::{SHARED_STRINGS_PART, WORKBOOK_PART, WORKBOOK_RELS_PART};

/// Parsed spreadsheet model: worksheets in workbook order plus the resolved
/// shared-string table. Only the parts the rewriter may touch are parsed;
/// everything else stays as raw container entries.
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub shared: SharedStrings,
}

pub struct Sheet {
    /// Display name from `xl/workbook.xml`.
    pub name: String,
    pub part_name: String,
    pub part: XmlPart,
}

pub struct SharedStrings {
    pub part: Option<XmlPart>,
    /// Text of each `<si>` entry in table order (rich-text runs
    /// concatenated, phonetic runs excluded).
    pub strings: Vec<String>,
}

impl Workbook {
    pub fn parse(package: &ContainerPackage) -> Result<Self, PipelineError> {
        let workbook_entry = package.entry(WORKBOOK_PART).ok_or_else(|| {
            PipelineError::InvalidContainer(format!("missing {WORKBOOK_PART}"))
        })?;
        let workbook_part = XmlPart::parse(WORKBOOK_PART, &workbook_entry.data)?;

        let rels_entry = package.entry(WORKBOOK_RELS_PART).ok_or_else(|| {
            PipelineError::InvalidContainer(format!("missing {WORKBOOK_RELS_PART}"))
        })?;
        let rels = parse_relationships(&XmlPart::parse(WORKBOOK_RELS_PART, &rels_entry.data)?);

        let mut sheets = Vec::new();
        for ev in &workbook_part.events {
            let (name, attrs) = match ev {
                XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs } => (name, attrs),
                _ => continue,
            };
            if name != "sheet" {
                continue;
            }
            let display_name = find_attr(attrs, "name").unwrap_or_default();
            let rel_id = find_attr(attrs, "r:id").ok_or_else(|| {
                PipelineError::InvalidContainer(format!(
                    "sheet '{display_name}' has no r:id relationship"
                ))
            })?;
            let target = rels.get(&rel_id).ok_or_else(|| {
                PipelineError::InvalidContainer(format!(
                    "unresolved sheet relationship {rel_id}"
                ))
            })?;
            let part_name = resolve_part_name(target);
            let entry = package.entry(&part_name).ok_or_else(|| {
                PipelineError::InvalidContainer(format!("missing worksheet part {part_name}"))
            })?;
            sheets.push(Sheet {
                name: unescape_attr(&display_name),
                part: XmlPart::parse(&part_name, &entry.data)?,
                part_name,
            });
        }

        let shared = match package.entry(SHARED_STRINGS_PART) {
            Some(entry) => {
                let part = XmlPart::parse(SHARED_STRINGS_PART, &entry.data)?;
                let strings = resolve_shared_strings(&part);
                SharedStrings {
                    part: Some(part),
                    strings,
                }
            }
            None => SharedStrings {
                part: None,
                strings: Vec::new(),
            },
        };

        Ok(Self { sheets, shared })
    }
}

fn parse_relationships(part: &XmlPart) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    for ev in &part.events {
        let attrs = match ev {
            XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs }
                if name == "Relationship" =>
            {
                attrs
            }
            _ => continue,
        };
        if let (Some(id), Some(target)) = (find_attr(attrs, "Id"), find_attr(attrs, "Target")) {
            rels.insert(id, target);
        }
    }
    rels
}

/// Relationship targets are relative to `xl/` unless they start with `/`.
fn resolve_part_name(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("xl/{target}")
    }
}

fn resolve_shared_strings(part: &XmlPart) -> Vec<String> {
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    for ev in &part.events {
        match ev {
            XmlEvent::Start { name, .. } => match name.as_str() {
                "si" => current = Some(String::new()),
                // Phonetic guide runs are display hints, not cell text.
                "rPh" => phonetic_depth += 1,
                "t" if current.is_some() && phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            XmlEvent::End { name } => match name.as_str() {
                "si" => {
                    if let Some(s) = current.take() {
                        strings.push(s);
                    }
                }
                "rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                "t" => in_text = false,
                _ => {}
            },
            XmlEvent::Text { text } => {
                if in_text {
                    if let Some(s) = current.as_mut() {
                        s.push_str(text);
                    }
                }
            }
            _ => {}
        }
    }
    strings
}

pub(super) fn find_attr(attrs: &[(String, String)], key: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

// Attribute values are stored raw; resolve the predefined entities for
// values used as plain text (sheet names).
fn unescape_attr(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
