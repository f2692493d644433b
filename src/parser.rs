//! CVAT annotation file parsing.
//!
//! Reads the CVAT "images" XML export into [`Element`] and
//! [`AnnotationPath`] records. Boxes drawn with a non-zero rotation are
//! converted on the spot: the drawn box is kept as `bbox_unrotated` and
//! the stored `bbox` becomes the axis-aligned box enclosing the rotated
//! rectangle, so every downstream consumer sees axis-aligned geometry.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, Point};
use crate::models::{AnnotationPath, ContentLayer, DocItemLabel, Element};

/// One annotated page image from a CVAT file.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    /// CVAT image id.
    pub id: u32,
    /// Image file name, the usual lookup key.
    pub name: String,
    /// Page width in pixels.
    pub width: f64,
    /// Page height in pixels.
    pub height: f64,
    /// Parsed box annotations, ids assigned in document order from 1.
    pub elements: Vec<Element>,
    /// Parsed polyline annotations, ids assigned in document order from 1.
    pub paths: Vec<AnnotationPath>,
}

/// All annotated images from one CVAT file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnnotations {
    /// Images in document order.
    pub images: Vec<AnnotatedImage>,
}

impl ParsedAnnotations {
    /// Look up an image by file name.
    pub fn get_image(&self, name: &str) -> Option<&AnnotatedImage> {
        self.images.iter().find(|img| img.name == name)
    }
}

/// A `<box>` being accumulated while its `<attribute>` children stream by.
struct PendingBox {
    label: String,
    bbox: BoundingBox,
    rotation: f64,
    content_layer: ContentLayer,
}

/// A `<polyline>` being accumulated.
struct PendingPath {
    label: String,
    points: Vec<Point>,
    level: u32,
}

fn get_attr(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}

fn require_attr(e: &BytesStart, tag: &str, name: &str) -> Result<String> {
    get_attr(e, name).ok_or_else(|| Error::MissingAttribute {
        tag: tag.to_string(),
        attribute: name.to_string(),
    })
}

fn parse_f64(attribute: &str, value: &str) -> Result<f64> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        attribute: attribute.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(attribute: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        attribute: attribute.to_string(),
        value: value.to_string(),
    })
}

/// Parse a CVAT `points` attribute: `"x1,y1;x2,y2;..."`.
fn parse_points(value: &str) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    for pair in value.split(';').filter(|s| !s.trim().is_empty()) {
        let mut coords = pair.splitn(2, ',');
        let x = coords.next().unwrap_or("");
        let y = coords.next().ok_or_else(|| Error::InvalidNumber {
            attribute: "points".to_string(),
            value: pair.to_string(),
        })?;
        points.push(Point::new(
            parse_f64("points", x)?,
            parse_f64("points", y)?,
        ));
    }
    Ok(points)
}

fn read_pending_box(e: &BytesStart) -> Result<PendingBox> {
    let label = require_attr(e, "box", "label")?;
    let xtl = parse_f64("xtl", &require_attr(e, "box", "xtl")?)?;
    let ytl = parse_f64("ytl", &require_attr(e, "box", "ytl")?)?;
    let xbr = parse_f64("xbr", &require_attr(e, "box", "xbr")?)?;
    let ybr = parse_f64("ybr", &require_attr(e, "box", "ybr")?)?;
    let rotation = match get_attr(e, "rotation") {
        Some(value) => parse_f64("rotation", &value)?,
        None => 0.0,
    };
    Ok(PendingBox {
        label,
        bbox: BoundingBox::new(xtl, ytl, xbr, ybr),
        rotation,
        content_layer: ContentLayer::Body,
    })
}

fn read_pending_path(e: &BytesStart) -> Result<PendingPath> {
    let label = require_attr(e, "polyline", "label")?;
    let points = parse_points(&require_attr(e, "polyline", "points")?)?;
    Ok(PendingPath {
        label,
        points,
        level: 1,
    })
}

fn read_image_header(e: &BytesStart) -> Result<AnnotatedImage> {
    Ok(AnnotatedImage {
        id: parse_u32("id", &require_attr(e, "image", "id")?)?,
        name: require_attr(e, "image", "name")?,
        width: parse_f64("width", &require_attr(e, "image", "width")?)?,
        height: parse_f64("height", &require_attr(e, "image", "height")?)?,
        elements: Vec::new(),
        paths: Vec::new(),
    })
}

/// Parse CVAT annotation XML from a string.
pub fn parse_cvat_str(xml: &str) -> Result<ParsedAnnotations> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut parsed = ParsedAnnotations::default();
    let mut image: Option<AnnotatedImage> = None;
    let mut next_element_id: u32 = 1;
    let mut next_path_id: u32 = 1;

    let mut pending_box: Option<PendingBox> = None;
    let mut pending_path: Option<PendingPath> = None;
    let mut attr_name: Option<String> = None;

    fn finalize_box(b: PendingBox, img: &mut AnnotatedImage, next_id: &mut u32) {
        match DocItemLabel::from_cvat_label(&b.label) {
            Some(label) => {
                img.elements.push(Element::from_drawn_box(
                    *next_id,
                    label,
                    b.bbox,
                    b.rotation,
                    b.content_layer,
                ));
                *next_id += 1;
            }
            None => log::warn!("skipping box with unknown label '{}'", b.label),
        }
    }

    fn finalize_path(p: PendingPath, img: &mut AnnotatedImage, next_id: &mut u32) -> Result<()> {
        if p.points.len() < 2 {
            return Err(Error::DegeneratePath { id: *next_id });
        }
        img.paths
            .push(AnnotationPath::with_level(*next_id, p.label, p.points, p.level));
        *next_id += 1;
        Ok(())
    }

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"image" => {
                    image = Some(read_image_header(&e)?);
                    next_element_id = 1;
                    next_path_id = 1;
                }
                b"box" => pending_box = Some(read_pending_box(&e)?),
                b"polyline" => pending_path = Some(read_pending_path(&e)?),
                b"attribute" => attr_name = get_attr(&e, "name"),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                // Self-closing tags carry no attribute children.
                b"box" => {
                    if let Some(img) = image.as_mut() {
                        finalize_box(read_pending_box(&e)?, img, &mut next_element_id);
                    }
                }
                b"polyline" => {
                    if let Some(img) = image.as_mut() {
                        finalize_path(read_pending_path(&e)?, img, &mut next_path_id)?;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match attr_name.as_deref() {
                    Some("content_layer") => {
                        if let Some(b) = pending_box.as_mut() {
                            b.content_layer = ContentLayer::from_cvat_attribute(&text);
                        }
                    }
                    Some("level") => {
                        if let Some(p) = pending_path.as_mut() {
                            p.level = parse_u32("level", &text)?;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"image" => {
                    if let Some(img) = image.take() {
                        parsed.images.push(img);
                    }
                }
                b"box" => {
                    if let (Some(b), Some(img)) = (pending_box.take(), image.as_mut()) {
                        finalize_box(b, img, &mut next_element_id);
                    }
                }
                b"polyline" => {
                    if let (Some(p), Some(img)) = (pending_path.take(), image.as_mut()) {
                        finalize_path(p, img, &mut next_path_id)?;
                    }
                }
                b"attribute" => attr_name = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    Ok(parsed)
}

/// Parse a CVAT annotation file from disk.
pub fn parse_cvat_file(path: impl AsRef<Path>) -> Result<ParsedAnnotations> {
    let xml = std::fs::read_to_string(path)?;
    parse_cvat_str(&xml)
}
