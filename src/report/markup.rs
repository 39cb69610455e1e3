// src/report/markup.rs
//! XML scan reports (checkstyle-like and ad-hoc issue lists).
//!
//! Every element is visited in document order; elements named like an issue
//! contribute one entry, with file and message taken from an attribute or a
//! direct child element.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{DEFAULT_FILE, IssueMap};

const ISSUE_TAGS: [&str; 5] = ["issue", "finding", "error", "warning", "violation"];
const DEFAULT_MESSAGE: &str = "Code issue";

/// An open element while walking the document
struct Frame {
    tag: String,
    attributes: Vec<(String, String)>,
    /// Direct children as (tag, text), in order
    children: Vec<(String, String)>,
    text: String,
    /// Slot reserved in `found` so issues keep document (pre-)order
    slot: Option<usize>,
}

impl Frame {
    fn open(start: &BytesStart<'_>, found: &mut Vec<Option<(String, String)>>) -> Option<Self> {
        let tag = String::from_utf8(start.name().as_ref().to_vec()).ok()?;
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.ok()?;
            let key = String::from_utf8(attr.key.as_ref().to_vec()).ok()?;
            let value = attr.unescape_value().ok()?.into_owned();
            attributes.push((key, value));
        }

        let slot = if ISSUE_TAGS.contains(&tag.as_str()) {
            found.push(None);
            Some(found.len() - 1)
        } else {
            None
        };

        Some(Self {
            tag,
            attributes,
            children: Vec::new(),
            text: String::new(),
            slot,
        })
    }

    /// Only character data before the first child element counts as the element's text
    fn push_text(&mut self, chunk: &str) {
        if self.children.is_empty() {
            self.text.push_str(chunk);
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn child_text(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|(tag, _)| tag == name)
            .map(|(_, text)| text.trim())
            .filter(|text| !text.is_empty())
    }

    fn issue(&self) -> (String, String) {
        let file = self
            .attribute("file")
            .or_else(|| self.child_text("file"))
            .or_else(|| self.child_text("path"))
            .unwrap_or(DEFAULT_FILE);
        let message = self
            .attribute("message")
            .or_else(|| self.child_text("message"))
            .or_else(|| self.child_text("description"))
            .unwrap_or(DEFAULT_MESSAGE);
        (file.to_string(), message.to_string())
    }
}

/// Parse a well-formed XML document. Anything that is not a single
/// well-formed root element is rejected outright.
pub fn parse_xml(text: &str) -> Option<IssueMap> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Frame> = Vec::new();
    let mut found: Vec<Option<(String, String)>> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event().ok()? {
            Event::Start(start) => {
                if stack.is_empty() && seen_root {
                    return None;
                }
                seen_root = true;
                stack.push(Frame::open(&start, &mut found)?);
            }
            Event::Empty(start) => {
                if stack.is_empty() && seen_root {
                    return None;
                }
                seen_root = true;
                let frame = Frame::open(&start, &mut found)?;
                close(frame, &mut stack, &mut found);
            }
            Event::End(_) => {
                let frame = stack.pop()?;
                close(frame, &mut stack, &mut found);
            }
            Event::Text(raw) => {
                let chunk = String::from_utf8_lossy(&raw);
                match stack.last_mut() {
                    Some(frame) => frame.push_text(&chunk),
                    // Character data outside the root element is not XML
                    None if !chunk.trim().is_empty() => return None,
                    None => {}
                }
            }
            Event::CData(raw) => {
                let frame = stack.last_mut()?;
                frame.push_text(&String::from_utf8_lossy(&raw));
            }
            Event::GeneralRef(reference) => {
                let frame = stack.last_mut()?;
                let resolved = resolve_entity(&String::from_utf8_lossy(&reference))?;
                frame.push_text(resolved.encode_utf8(&mut [0; 4]));
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
    }

    if !stack.is_empty() || !seen_root {
        return None;
    }

    let mut issues = IssueMap::new();
    for (file, message) in found.into_iter().flatten() {
        issues.push(file, message);
    }
    issues.non_empty()
}

fn close(frame: Frame, stack: &mut [Frame], found: &mut [Option<(String, String)>]) {
    if let Some(slot) = frame.slot {
        found[slot] = Some(frame.issue());
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push((frame.tag, frame.text));
    }
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_attributes_and_child_elements() {
        let xml = r#"<?xml version="1.0"?>
<report>
  <issue file="app.py" message="unused variable"/>
  <warning>
    <path>lib/util.js</path>
    <description>prefer const</description>
  </warning>
  <error file="app.py"><message>undefined name &amp; friends</message></error>
</report>"#;
        let map = parse_xml(xml).unwrap();
        assert_eq!(map.get("app.py").unwrap(), ["unused variable", "undefined name & friends"]);
        assert_eq!(map.get("lib/util.js").unwrap(), ["prefer const"]);
    }

    #[test]
    fn child_text_stops_at_first_sub_element() {
        let xml = r#"<r><issue><file>a.py</file><message>unsafe eval<code>eval(x)</code> in handler</message></issue></r>"#;
        let map = parse_xml(xml).unwrap();
        assert_eq!(map.get("a.py").unwrap(), ["unsafe eval"]);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let map = parse_xml("<results><violation/></results>").unwrap();
        assert_eq!(map.get("main.py").unwrap(), ["Code issue"]);
    }

    #[test]
    fn root_element_can_itself_be_an_issue() {
        let map = parse_xml(r#"<finding file="x.go" message="shadowed err"/>"#).unwrap();
        assert_eq!(map.get("x.go").unwrap(), ["shadowed err"]);
    }

    #[test]
    fn nested_issues_keep_document_order() {
        let xml = r#"<r><issue file="a.py" message="outer"><finding file="a.py" message="inner"/></issue></r>"#;
        let map = parse_xml(xml).unwrap();
        assert_eq!(map.get("a.py").unwrap(), ["outer", "inner"]);
    }

    #[test]
    fn documents_without_issue_elements_are_rejected() {
        assert!(parse_xml("<report><summary>clean</summary></report>").is_none());
    }

    #[test]
    fn rejects_malformed_and_non_xml_input() {
        assert!(parse_xml("app.py: missing semicolon").is_none());
        assert!(parse_xml(r#"{"findings": []}"#).is_none());
        assert!(parse_xml("<report><issue file=\"a.py\"></report>").is_none());
        assert!(parse_xml("<issue file=\"a.py\">").is_none());
        assert!(parse_xml("file,message\n<issue file=\"a.py\"/>").is_none());
    }
}
