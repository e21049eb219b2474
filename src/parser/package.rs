//! OOXML package access for Word documents.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

const PACKAGE_RELS_PART: &str = "_rels/.rels";
const FALLBACK_MAIN_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const IMAGE_REL: &str = "/image";
/// Largest buffer reserved before a part is actually read.
const MAX_RESERVE: u64 = 1 << 20;

/// Resolves image relationship ids to raw image bytes.
pub trait ImageSource: Sync {
    /// Get the raw bytes of the image part behind `rel_id`.
    fn resolve(&self, rel_id: &str) -> Result<&[u8]>;
}

/// A single package relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship type URI
    pub rel_type: String,
    /// Resolved part name inside the package, or the raw target if external
    pub target: String,
    /// Whether the target lives outside the package
    pub external: bool,
}

/// An opened DOCX package.
///
/// The main document XML and every image part it references are read up
/// front, so the package can be shared across threads while parsing.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    main_part: String,
    document_xml: Vec<u8>,
    relationships: HashMap<String, Relationship>,
    images: HashMap<String, Vec<u8>>,
}

impl DocxPackage {
    /// Open a package from its bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    /// Open a package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(reader).map_err(|e| match e {
            zip::result::ZipError::Io(io) => Error::Io(io),
            _ => Error::UnknownFormat,
        })?;

        let main_part = locate_main_part(&mut archive)?;
        let document_xml = read_part(&mut archive, &main_part)?
            .ok_or_else(|| Error::MissingPart(main_part.clone()))?;

        let relationships = match read_part(&mut archive, &rels_part_for(&main_part))? {
            Some(xml) => parse_relationships(&xml, &part_folder(&main_part))?,
            None => HashMap::new(),
        };

        let mut images = HashMap::new();
        for (id, rel) in &relationships {
            if rel.external || !rel.rel_type.ends_with(IMAGE_REL) {
                continue;
            }
            match read_part(&mut archive, &rel.target) {
                Ok(Some(data)) => {
                    images.insert(id.clone(), data);
                }
                Ok(None) => log::warn!("Image part {} for {} is missing", rel.target, id),
                Err(e) => log::warn!("Failed to read image part {}: {}", rel.target, e),
            }
        }

        log::debug!(
            "Opened package: main part {}, {} relationships, {} images",
            main_part,
            relationships.len(),
            images.len()
        );

        Ok(Self {
            main_part,
            document_xml,
            relationships,
            images,
        })
    }

    /// Name of the main document part, e.g. `word/document.xml`.
    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    /// Raw XML of the main document part.
    pub fn document_xml(&self) -> &[u8] {
        &self.document_xml
    }

    /// Relationships of the main document part, keyed by id.
    pub fn relationships(&self) -> &HashMap<String, Relationship> {
        &self.relationships
    }

    /// Number of image parts loaded from the package.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl ImageSource for DocxPackage {
    fn resolve(&self, rel_id: &str) -> Result<&[u8]> {
        if let Some(data) = self.images.get(rel_id) {
            return Ok(data);
        }
        match self.relationships.get(rel_id) {
            None => Err(Error::MissingPart(format!("relationship {}", rel_id))),
            Some(rel) if rel.external => Err(Error::MissingPart(format!(
                "{} points to external target {}",
                rel_id, rel.target
            ))),
            Some(rel) if !rel.rel_type.ends_with(IMAGE_REL) => Err(Error::MissingPart(format!(
                "{} is not an image relationship",
                rel_id
            ))),
            Some(rel) => Err(Error::MissingPart(rel.target.clone())),
        }
    }
}

/// In-memory image source keyed by relationship id.
impl ImageSource for HashMap<String, Vec<u8>> {
    fn resolve(&self, rel_id: &str) -> Result<&[u8]> {
        self.get(rel_id)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingPart(format!("relationship {}", rel_id)))
    }
}

fn locate_main_part<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<String> {
    if let Some(xml) = read_part(archive, PACKAGE_RELS_PART)? {
        let rels = parse_relationships(&xml, "")?;
        let main = rels
            .values()
            .find(|rel| !rel.external && rel.rel_type.ends_with(OFFICE_DOCUMENT_REL));
        if let Some(rel) = main {
            return Ok(rel.target.clone());
        }
        log::debug!("No officeDocument relationship, using {}", FALLBACK_MAIN_PART);
    }
    Ok(FALLBACK_MAIN_PART.to_string())
}

/// Read a part by name, returning `None` if the package has no such entry.
fn read_part<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::with_capacity(reserve_hint(entry.size()));
    entry.read_to_end(&mut data)?;
    Ok(Some(data))
}

/// Upfront allocation for a part; the declared size comes from the archive itself.
fn reserve_hint(declared: u64) -> usize {
    declared.min(MAX_RESERVE) as usize
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`
fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((folder, name)) => format!("{}/_rels/{}.rels", folder, name),
        None => format!("_rels/{}.rels", part),
    }
}

/// `word/document.xml` -> `word`
fn part_folder(part: &str) -> String {
    part.rsplit_once('/')
        .map(|(folder, _)| folder.to_string())
        .unwrap_or_default()
}

/// Resolve a relationship target against the folder of its source part.
pub(crate) fn resolve_target(folder: &str, target: &str) -> String {
    let (mut segments, target) = match target.strip_prefix('/') {
        Some(absolute) => (Vec::new(), absolute),
        None => (
            folder.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>(),
            target,
        ),
    };

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

fn parse_relationships(xml: &[u8], folder: &str) -> Result<HashMap<String, Relationship>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let Some((id, rel)) = relationship_from(e, folder)? {
                    relationships.insert(id, rel);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

fn relationship_from(e: &BytesStart<'_>, folder: &str) -> Result<Option<(String, Relationship)>> {
    let mut id = None;
    let mut rel_type = String::new();
    let mut target = None;
    let mut external = false;

    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();
        match attr.key.local_name().as_ref() {
            b"Id" => id = Some(value),
            b"Type" => rel_type = value,
            b"Target" => target = Some(value),
            b"TargetMode" => external = value.eq_ignore_ascii_case("External"),
            _ => {}
        }
    }

    let (Some(id), Some(target)) = (id, target) else {
        return Ok(None);
    };
    let target = if external {
        target
    } else {
        resolve_target(folder, &target)
    };

    Ok(Some((
        id,
        Relationship {
            rel_type,
            target,
            external,
        },
    )))
}
