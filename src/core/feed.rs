use crate::domain::model::{OfferElement, RawCategory, RawOffer};
use crate::utils::error::{EtlError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const CATEGORY_TAG: &[u8] = b"category";
const CATEGORIES_TAG: &[u8] = b"categories";
const OFFER_TAG: &[u8] = b"offer";
const OFFERS_TAG: &[u8] = b"offers";

/// Streaming reader over a YML/XML marketplace feed.
///
/// Only the element currently being read is held in memory, so feeds much
/// larger than RAM can be processed.
pub struct FeedReader<R: BufRead> {
    reader: Reader<R>,
    /// Elements opened outside of offers and categories, outermost first.
    open_tags: Vec<String>,
}

impl FeedReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> FeedReader<R> {
    pub fn new(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            open_tags: Vec::new(),
        }
    }

    /// Bytes consumed from the underlying reader so far.
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Reads `<category>` elements in document order. Stops at the end of
    /// the `<categories>` block, at the start of `<offers>`, or at EOF.
    pub fn read_categories(&mut self) -> Result<Vec<RawCategory>> {
        let mut categories = Vec::new();
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == CATEGORY_TAG => {
                    let attrs = attributes(&e);
                    let name = self.read_text()?.unwrap_or_default();
                    categories.push(category_from(attrs, name));
                }
                Event::Empty(e) if e.local_name().as_ref() == CATEGORY_TAG => {
                    categories.push(category_from(attributes(&e), String::new()));
                }
                Event::End(e) if e.local_name().as_ref() == CATEGORIES_TAG => {
                    self.open_tags.pop();
                    break;
                }
                Event::Start(e) if e.local_name().as_ref() == OFFERS_TAG => {
                    self.open_tags.push(tag_name(&e));
                    break;
                }
                Event::Start(e) => self.open_tags.push(tag_name(&e)),
                Event::End(_) => {
                    self.open_tags.pop();
                }
                Event::Eof => {
                    self.check_closed()?;
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(categories)
    }

    /// Next `<offer>` in the feed, or `None` at EOF. A feed that ends while
    /// its root is still open is truncated and reported as an error.
    pub fn next_offer(&mut self) -> Result<Option<RawOffer>> {
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == OFFER_TAG => {
                    let attrs = attributes(&e);
                    let elements = self.read_offer_elements()?;
                    return Ok(Some(RawOffer {
                        attributes: attrs,
                        elements,
                    }));
                }
                Event::Empty(e) if e.local_name().as_ref() == OFFER_TAG => {
                    return Ok(Some(RawOffer {
                        attributes: attributes(&e),
                        elements: Vec::new(),
                    }));
                }
                Event::Start(e) => self.open_tags.push(tag_name(&e)),
                Event::End(_) => {
                    self.open_tags.pop();
                }
                Event::Eof => {
                    self.check_closed()?;
                    return Ok(None);
                }
                _ => {}
            }
            buf.clear();
        }
    }

    fn check_closed(&self) -> Result<()> {
        match self.open_tags.last() {
            Some(tag) => Err(unexpected_eof(tag)),
            None => Ok(()),
        }
    }

    fn read_offer_elements(&mut self) -> Result<Vec<OfferElement>> {
        let mut elements = Vec::new();
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let tag = tag_name(&e);
                    let attrs = attributes(&e);
                    let text = self.read_text()?;
                    elements.push(OfferElement {
                        tag,
                        attributes: attrs,
                        text,
                    });
                }
                Event::Empty(e) => elements.push(OfferElement {
                    tag: tag_name(&e),
                    attributes: attributes(&e),
                    text: None,
                }),
                Event::End(_) => return Ok(elements),
                Event::Eof => return Err(unexpected_eof("offer")),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Collects the direct text of the element whose start tag was just
    /// read, consuming everything up to and including its end tag. Text on
    /// either side of a nested element is joined with a single space.
    fn read_text(&mut self) -> Result<Option<String>> {
        let mut parts: Vec<String> = Vec::new();
        let mut depth = 0usize;
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Text(t) if depth == 0 => match t.unescape() {
                    Ok(unescaped) => parts.push(unescaped.into_owned()),
                    Err(e) => {
                        // Feeds routinely carry HTML entities such as &nbsp;
                        tracing::debug!("Keeping raw text after unescape failure: {}", e);
                        parts.push(String::from_utf8_lossy(&t).into_owned());
                    }
                },
                Event::CData(c) if depth == 0 => {
                    parts.push(String::from_utf8_lossy(&c.into_inner()).into_owned());
                }
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Event::Eof => return Err(unexpected_eof("element")),
                _ => {}
            }
            buf.clear();
        }

        let text = parts
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok((!text.is_empty()).then_some(text))
    }
}

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn attributes(start: &BytesStart<'_>) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.insert(key, value);
    }
    attrs
}

fn category_from(mut attrs: HashMap<String, String>, name: String) -> RawCategory {
    RawCategory {
        id: attrs.remove("id").unwrap_or_default(),
        parent_id: attrs.remove("parentId").unwrap_or_default(),
        name,
    }
}

fn unexpected_eof(inside: &str) -> EtlError {
    EtlError::FeedError {
        message: format!("Unexpected end of feed inside <{}>", inside),
    }
}
