//! PPTX file parser implementation.

use deck_core::{DeckExtractor, Error, Result, SlideRecord};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";

/// Placeholder types on a notes page that are page furniture, not notes.
const NOTES_FURNITURE: &[&str] = &["sldNum", "dt", "hdr", "ftr", "sldImg"];

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX package into slide records, in presentation order.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Vec<SlideRecord>> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let slide_paths = self.get_slide_order(&mut archive)?;
        log::debug!("Found {} slides in package", slide_paths.len());

        slide_paths
            .iter()
            .enumerate()
            .map(|(idx, path)| self.parse_slide(&mut archive, path, idx + 1))
            .collect()
    }

    /// Get the ordered list of slide part paths.
    ///
    /// Uses `p:sldIdLst` in presentation.xml; falls back to the numeric
    /// suffix of relationship ids when the list is missing.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self
            .read_file_from_archive(archive, PRESENTATION_RELS_PATH)?
            .ok_or_else(|| {
                Error::PptxParseError(format!("Missing '{}'", PRESENTATION_RELS_PATH))
            })?;
        let slide_rels: Vec<Relationship> = parse_relationships(&rels_content)?
            .into_iter()
            .filter(Relationship::is_slide)
            .collect();

        let presentation = self
            .read_file_from_archive(archive, PRESENTATION_PATH)?
            .ok_or_else(|| Error::PptxParseError(format!("Missing '{}'", PRESENTATION_PATH)))?;
        let listed_ids = parse_slide_id_list(&presentation)?;

        if !listed_ids.is_empty() {
            return listed_ids
                .iter()
                .map(|rid| {
                    slide_rels
                        .iter()
                        .find(|rel| &rel.id == rid)
                        .map(|rel| resolve_target("ppt", &rel.target))
                        .ok_or_else(|| {
                            Error::CorruptedFile(format!(
                                "Slide list references unknown relationship '{}'",
                                rid
                            ))
                        })
                })
                .collect();
        }

        log::debug!("No slide id list in presentation.xml; ordering by relationship id");
        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .iter()
            .map(|rel| {
                let order_num =
                    extract_slide_number(&rel.id).or_else(|| extract_slide_number(&rel.target));
                (resolve_target("ppt", &rel.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide and its notes page.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<SlideRecord> {
        let content = self
            .read_file_from_archive(archive, slide_path)?
            .ok_or_else(|| Error::CorruptedFile(format!("Missing slide part '{}'", slide_path)))?;

        let slide_text = extract_shapes_from_xml(&content)?
            .into_iter()
            .filter(|shape| !shape.text.trim().is_empty())
            .map(|shape| shape.text)
            .collect::<Vec<_>>()
            .join("\n");

        let notes_text = match self.notes_path(archive, slide_path)? {
            Some(notes_path) => self.parse_notes(archive, &notes_path)?,
            None => String::new(),
        };

        Ok(SlideRecord::new(slide_number, slide_text, notes_text))
    }

    /// Find the notes page attached to a slide through the slide's relationships.
    fn notes_path<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
    ) -> Result<Option<String>> {
        let (dir, file) = split_part_path(slide_path);
        let rels_path = format!("{}/_rels/{}.rels", dir, file);

        let Some(rels_content) = self.read_file_from_archive(archive, &rels_path)? else {
            return Ok(None);
        };

        Ok(parse_relationships(&rels_content)?
            .into_iter()
            .find(|rel| rel.rel_type.ends_with("/notesSlide"))
            .map(|rel| resolve_target(dir, &rel.target)))
    }

    fn parse_notes<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        notes_path: &str,
    ) -> Result<String> {
        let Some(content) = self.read_file_from_archive(archive, notes_path)? else {
            log::warn!("Notes part '{}' is referenced but missing", notes_path);
            return Ok(String::new());
        };

        Ok(extract_shapes_from_xml(&content)?
            .into_iter()
            .filter(|shape| {
                !shape
                    .placeholder
                    .as_deref()
                    .is_some_and(|ph| NOTES_FURNITURE.contains(&ph))
            })
            .filter(|shape| !shape.text.trim().is_empty())
            .map(|shape| shape.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Read a file from the ZIP archive, or `None` if it does not exist.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<Option<String>> {
        let mut file = match archive.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(Error::ZipError(format!(
                    "Failed to open '{}' in archive: {}",
                    path, e
                )))
            }
        };

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(Some(content))
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckExtractor for PptxParser {
    fn extract(&self, data: &[u8]) -> Result<Vec<SlideRecord>> {
        self.parse(Cursor::new(data))
    }
}

/// A package relationship entry.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

impl Relationship {
    fn is_slide(&self) -> bool {
        self.rel_type.ends_with("/slide")
    }
}

/// Text and placeholder type of one `p:sp` shape.
#[derive(Debug, Default)]
struct ShapeText {
    text: String,
    placeholder: Option<String>,
}

fn parse_relationships(xml_content: &str) -> Result<Vec<Relationship>> {
    let mut rels = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Relationship ids from `p:sldIdLst`, in presentation order.
fn parse_slide_id_list(xml_content: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                let rid = e.attributes().flatten().find_map(|attr| {
                    let key = attr.key.as_ref();
                    (key != b"id" && local_name(key) == b"id")
                        .then(|| String::from_utf8_lossy(&attr.value).to_string())
                });
                if let Some(rid) = rid {
                    ids.push(rid);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Extract the text of every `p:sp` shape from slide or notes XML, in
/// document order.
///
/// Paragraphs are joined with newlines and `a:br` becomes a newline. Only
/// `a:t` content is text.
fn extract_shapes_from_xml(xml_content: &str) -> Result<Vec<ShapeText>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml_content);

    let mut current_shape: Option<ShapeText> = None;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut in_text_body = false;
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => {
                    current_shape = Some(ShapeText::default());
                    paragraphs.clear();
                }
                b"ph" => record_placeholder(&mut current_shape, e),
                b"txBody" if current_shape.is_some() => in_text_body = true,
                b"p" if in_text_body => paragraphs.push(String::new()),
                b"t" if in_text_body => in_run_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"ph" => record_placeholder(&mut current_shape, e),
                b"p" if in_text_body => paragraphs.push(String::new()),
                b"br" if in_text_body => {
                    if let Some(paragraph) = paragraphs.last_mut() {
                        paragraph.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_run_text {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::XmlError(format!("Bad text content: {}", err)))?;
                    if let Some(paragraph) = paragraphs.last_mut() {
                        paragraph.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => {
                    if let Some(mut shape) = current_shape.take() {
                        shape.text = paragraphs.join("\n");
                        shapes.push(shape);
                    }
                    paragraphs.clear();
                    in_text_body = false;
                    in_run_text = false;
                }
                b"txBody" => in_text_body = false,
                b"t" => in_run_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(shapes)
}

fn record_placeholder(shape: &mut Option<ShapeText>, e: &BytesStart) {
    if let Some(shape) = shape {
        let ph_type = e
            .attributes()
            .flatten()
            .find(|attr| attr.key.as_ref() == b"type")
            .map(|attr| String::from_utf8_lossy(&attr.value).to_string());
        // A placeholder with no type attribute is a body/object placeholder.
        shape.placeholder = Some(ph_type.unwrap_or_else(|| "body".to_string()));
    }
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Split "ppt/slides/slide1.xml" into ("ppt/slides", "slide1.xml").
fn split_part_path(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
