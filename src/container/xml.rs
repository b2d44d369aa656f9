use quick_xml::events::Event;
use quick_xml::Reader;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::PipelineError;

/// One event of a parsed XML part. Parts are kept as flat event vectors so
/// text can be rewritten in place without touching surrounding markup, and
/// so extraction can hand the rewriter plain event indices as locations.
#[derive(Clone, Debug)]
pub enum XmlEvent {
    Decl {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Empty {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text {
        text: String,
    },
    CData {
        text: String,
    },
    Comment {
        text: String,
    },
    PI {
        content: String,
    },
    DocType {
        text: String,
    },
}

#[derive(Clone)]
pub struct XmlPart {
    pub name: String,
    pub events: Vec<XmlEvent>,
}

impl XmlPart {
    pub fn parse(name: &str, xml_bytes: &[u8]) -> Result<Self, PipelineError> {
        let bad = |e: &dyn std::fmt::Display| {
            PipelineError::InvalidContainer(format!("parse {name}: {e}"))
        };
        let mut reader = Reader::from_reader(xml_bytes);
        reader.config_mut().trim_text(false);

        let mut events: Vec<XmlEvent> = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let ev = reader.read_event_into(&mut buf).map_err(|e| bad(&e))?;
            match ev {
                Event::Eof => break,
                Event::Decl(d) => {
                    let version = bytes_to_string(d.version().map_err(|e| bad(&e))?);
                    let encoding = d
                        .encoding()
                        .map(|r| r.map(bytes_to_string))
                        .transpose()
                        .unwrap_or(None);
                    let standalone = d
                        .standalone()
                        .map(|r| r.map(bytes_to_string))
                        .transpose()
                        .unwrap_or(None);
                    events.push(XmlEvent::Decl {
                        version,
                        encoding,
                        standalone,
                    });
                }
                Event::Start(s) => {
                    let mut attrs = Vec::new();
                    for a in s.attributes() {
                        let a = a.map_err(|e| bad(&e))?;
                        // Raw (already-escaped) attribute bytes. Unescaping
                        // here and re-escaping on write would turn character
                        // references like `&#13;&#10;` into literal newlines,
                        // which XML attribute normalization then corrupts.
                        attrs.push((
                            bytes_to_string(a.key.as_ref()),
                            bytes_to_string(a.value.as_ref()),
                        ));
                    }
                    events.push(XmlEvent::Start {
                        name: bytes_to_string(s.name().as_ref()),
                        attrs,
                    });
                }
                Event::Empty(s) => {
                    let mut attrs = Vec::new();
                    for a in s.attributes() {
                        let a = a.map_err(|e| bad(&e))?;
                        attrs.push((
                            bytes_to_string(a.key.as_ref()),
                            bytes_to_string(a.value.as_ref()),
                        ));
                    }
                    events.push(XmlEvent::Empty {
                        name: bytes_to_string(s.name().as_ref()),
                        attrs,
                    });
                }
                Event::End(e) => {
                    events.push(XmlEvent::End {
                        name: bytes_to_string(e.name().as_ref()),
                    });
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| bad(&e))?.into_owned();
                    events.push(XmlEvent::Text { text });
                }
                Event::CData(t) => {
                    events.push(XmlEvent::CData {
                        text: bytes_to_string(t.into_inner()),
                    });
                }
                Event::Comment(t) => {
                    events.push(XmlEvent::Comment {
                        text: bytes_to_string(t.into_inner()),
                    });
                }
                Event::PI(t) => {
                    let target = bytes_to_string(t.target());
                    let content = bytes_to_string(t.content());
                    events.push(XmlEvent::PI {
                        content: format!("{target}{content}"),
                    });
                }
                Event::DocType(t) => {
                    events.push(XmlEvent::DocType {
                        text: bytes_to_string(t.into_inner()),
                    });
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            events,
        })
    }

    /// Replace the character content of the Text event at `idx`. The
    /// rewriter resolves locations recorded at extraction time; anything
    /// else at that index is a contract violation.
    pub fn set_text(&mut self, idx: usize, text: &str) -> Result<(), PipelineError> {
        match self.events.get_mut(idx) {
            Some(XmlEvent::Text { text: t }) => {
                *t = text.to_string();
                Ok(())
            }
            _ => Err(PipelineError::Rewrite(format!(
                "expected Text event at {idx} in {}",
                self.name
            ))),
        }
    }

    /// Set (or add) an attribute on the element event at `idx`.
    pub fn set_attr(
        &mut self,
        idx: usize,
        key: &str,
        value: &str,
    ) -> Result<(), PipelineError> {
        match self.events.get_mut(idx) {
            Some(XmlEvent::Start { attrs, .. }) | Some(XmlEvent::Empty { attrs, .. }) => {
                for (k, v) in attrs.iter_mut() {
                    if k == key {
                        *v = value.to_string();
                        return Ok(());
                    }
                }
                attrs.push((key.to_string(), value.to_string()));
                Ok(())
            }
            _ => Err(PipelineError::Rewrite(format!(
                "expected element event at {idx} in {}",
                self.name
            ))),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for ev in &self.events {
            match ev {
                XmlEvent::Decl {
                    version,
                    encoding,
                    standalone,
                } => {
                    out.extend_from_slice(b"<?xml version=\"");
                    out.extend_from_slice(version.as_bytes());
                    out.extend_from_slice(b"\"");
                    if let Some(enc) = encoding {
                        out.extend_from_slice(b" encoding=\"");
                        out.extend_from_slice(enc.as_bytes());
                        out.extend_from_slice(b"\"");
                    }
                    if let Some(sa) = standalone {
                        out.extend_from_slice(b" standalone=\"");
                        out.extend_from_slice(sa.as_bytes());
                        out.extend_from_slice(b"\"");
                    }
                    out.extend_from_slice(b"?>");
                }
                XmlEvent::Start { name, attrs } => write_tag(&mut out, name, attrs, false),
                XmlEvent::Empty { name, attrs } => write_tag(&mut out, name, attrs, true),
                XmlEvent::End { name } => {
                    out.extend_from_slice(b"</");
                    out.extend_from_slice(name.as_bytes());
                    out.extend_from_slice(b">");
                }
                XmlEvent::Text { text } => escape_text_into(&mut out, text),
                XmlEvent::CData { text } => {
                    out.extend_from_slice(b"<![CDATA[");
                    out.extend_from_slice(text.as_bytes());
                    out.extend_from_slice(b"]]>");
                }
                XmlEvent::Comment { text } => {
                    out.extend_from_slice(b"<!--");
                    out.extend_from_slice(text.as_bytes());
                    out.extend_from_slice(b"-->");
                }
                XmlEvent::PI { content } => {
                    out.extend_from_slice(b"<?");
                    out.extend_from_slice(content.as_bytes());
                    out.extend_from_slice(b"?>");
                }
                XmlEvent::DocType { text } => {
                    out.extend_from_slice(b"<!DOCTYPE");
                    out.extend_from_slice(text.as_bytes());
                    out.extend_from_slice(b">");
                }
            }
        }
        out
    }
}

fn write_tag(out: &mut Vec<u8>, name: &str, attrs: &[(String, String)], empty: bool) {
    out.extend_from_slice(b"<");
    out.extend_from_slice(name.as_bytes());
    // Attribute values are raw (already-escaped) XML bytes; do not escape.
    for (k, v) in attrs {
        out.extend_from_slice(b" ");
        out.extend_from_slice(k.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(v.as_bytes());
        out.extend_from_slice(b"\"");
    }
    if empty {
        out.extend_from_slice(b"/>");
    } else {
        out.extend_from_slice(b">");
    }
}

fn escape_text_into(out: &mut Vec<u8>, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

// Tags whose character content the rewriter is allowed to change: Word text
// runs, SpreadsheetML inline/shared string text, and cell values.
fn is_rewritable_text_tag(name: &str) -> bool {
    matches!(name, "w:t" | "t" | "v")
}

/// Digest over everything the translation pipeline must not change: element
/// structure, attributes (minus `xml:space`, which the rewriter may add) and
/// all character data outside rewritable text tags. Equal digests before and
/// after a rewrite mean only text moved.
pub fn structure_digest(part: &XmlPart) -> String {
    let mut hasher = Sha256::new();
    let mut stack: Vec<&str> = Vec::new();

    for ev in &part.events {
        match ev {
            XmlEvent::Start { name, attrs } => {
                hash_tag(&mut hasher, name, attrs);
                stack.push(name);
            }
            XmlEvent::Empty { name, attrs } => {
                hash_tag(&mut hasher, name, attrs);
                hasher.update(b"E:");
                hasher.update(name.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::End { name } => {
                hasher.update(b"E:");
                hasher.update(name.as_bytes());
                hasher.update(b"\n");
                let _ = stack.pop();
            }
            XmlEvent::Text { text } => {
                let parent = stack.last().copied().unwrap_or("");
                if is_rewritable_text_tag(parent) {
                    continue;
                }
                hasher.update(b"T:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::Decl {
                version,
                encoding,
                standalone,
            } => {
                hasher.update(b"D:");
                hasher.update(version.as_bytes());
                hasher.update(b"|");
                hasher.update(encoding.as_deref().unwrap_or("").as_bytes());
                hasher.update(b"|");
                hasher.update(standalone.as_deref().unwrap_or("").as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::CData { text } => {
                hasher.update(b"C:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::Comment { text } => {
                hasher.update(b"M:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::PI { content } => {
                hasher.update(b"P:");
                hasher.update(content.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::DocType { text } => {
                hasher.update(b"Y:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
        }
    }
    hex::encode(hasher.finalize())
}

fn hash_tag(hasher: &mut Sha256, name: &str, attrs: &[(String, String)]) {
    hasher.update(b"S:");
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    let mut sorted: BTreeMap<&str, &str> = BTreeMap::new();
    for (k, v) in attrs {
        if k == "xml:space" {
            continue;
        }
        sorted.insert(k, v);
    }
    for (k, v) in sorted {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"\n");
}
