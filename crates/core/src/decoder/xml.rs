//! `quick-xml` backed decoder.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{DecodeError, Decoder, Document, Element};

/// Decodes Pazpar2 XML responses into an element tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlDecoder;

impl XmlDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for XmlDecoder {
    fn decode(&self, raw: &[u8]) -> Result<Document, DecodeError> {
        let mut reader = Reader::from_reader(raw);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| DecodeError::Malformed(e.to_string()))?;

            match event {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DecodeError::Malformed("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    // Character data outside the root is ignored
                    if let Some(current) = stack.last_mut() {
                        let text = text
                            .unescape()
                            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
                        current.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(DecodeError::Malformed(format!(
                "unclosed element <{}>",
                open.name
            )));
        }

        root.map(Document::new).ok_or(DecodeError::Empty)
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, DecodeError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));

    for attr in start.attributes() {
        let attr = attr.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }

    Ok(element)
}

/// Attach a finished element to its parent, or make it the root.
fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DecodeError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(DecodeError::Malformed(format!(
            "second root element <{}>",
            element.name
        ))),
    }
}
