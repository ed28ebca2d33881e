use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, ExtractionStep, Result};
use crate::timestamp::parse_seconds;
use crate::{Transcript, TranscriptSegment};

const TEXT_TAG: &[u8] = b"text";

/// Parse a timed-text document into segments, one per `<text>` element in document order.
///
/// Missing or unparsable `start`/`dur` attributes default to zero.
pub fn parse_timed_text(xml: &str) -> Result<Transcript> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<TranscriptSegment> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == TEXT_TAG => {
                current = Some(open_segment(e));
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == TEXT_TAG => {
                segments.push(open_segment(e));
            }
            Ok(Event::Text(ref e)) => {
                if let Some(seg) = current.as_mut() {
                    match e.unescape() {
                        Ok(text) => seg.text.push_str(&text),
                        Err(err) => {
                            // HTML-only entities such as `&eacute;` are decoded in `clean_text`
                            debug!("Keeping raw timed-text content ({err})");
                            seg.text.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(seg) = current.as_mut() {
                    seg.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == TEXT_TAG => {
                if let Some(mut seg) = current.take() {
                    seg.text = clean_text(&seg.text);
                    segments.push(seg);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::extraction(
                    ExtractionStep::ResponseBody,
                    format!("error parsing timed-text XML at {}: {e}", reader.buffer_position()),
                ));
            }
            _ => {}
        }
    }

    debug!("Parsed {} timed-text segments", segments.len());
    Ok(Transcript { segments })
}

fn open_segment(e: &BytesStart<'_>) -> TranscriptSegment {
    let mut start = None;
    let mut dur = None;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"start" => start = Some(String::from_utf8_lossy(&attr.value).into_owned()),
            b"dur" => dur = Some(String::from_utf8_lossy(&attr.value).into_owned()),
            _ => {}
        }
    }
    TranscriptSegment {
        offset_seconds: parse_seconds(start.as_deref()),
        duration_seconds: parse_seconds(dur.as_deref()),
        text: String::new(),
    }
}

// Caption text arrives double-escaped (`&amp;#39;`), so decode entities once more.
fn clean_text(raw: &str) -> String {
    html_escape::decode_html_entities(raw).replace('\n', "")
}
