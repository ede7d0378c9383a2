/*!
 * EPUB container access.
 *
 * An EPUB is a zip archive. Entries are read into memory together with their
 * compression method, timestamp and permissions so a translated copy can be written
 * with only the chapter documents changed. Chapters are listed in reading order by
 * following `META-INF/container.xml` to the package document and its spine.
 */

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use url::Url;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::AppError;
use crate::markup::dom::{Document, NodeId, split_prolog};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Manifest media types that hold chapter content
const CHAPTER_MEDIA_TYPES: &[&str] = &["application/xhtml+xml", "text/html"];

/// Archive root as a URL, so manifest hrefs resolve with standard relative-reference rules
static ARCHIVE_ROOT: Lazy<Url> = Lazy::new(|| Url::parse("epub:///").expect("Invalid archive root URL"));

/// File extensions treated as chapters when the package document is unusable
const CHAPTER_EXTENSIONS: &[&str] = &[".xhtml", ".html", ".htm"];

/// A file stored in the archive
#[derive(Debug)]
pub struct EpubEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

/// An EPUB read fully into memory
#[derive(Debug)]
pub struct EpubArchive {
    pub entries: Vec<EpubEntry>,
}

impl EpubArchive {
    pub fn read(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| AppError::File(format!("open epub {}: {}", path.display(), e)))?;
        Self::from_reader(f).with_context(|| format!("read epub: {}", path.display()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut zip = ZipArchive::new(reader).map_err(|e| AppError::Archive(format!("not a zip container: {}", e)))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip
                .by_index(i)
                .map_err(|e| AppError::Archive(format!("zip entry {}: {}", i, e)))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).context("read zip entry")?;
            entries.push(EpubEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entry(&self, name: &str) -> Option<&EpubEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Chapter document as text, without a byte order mark
    pub fn chapter_markup(&self, name: &str) -> Result<String> {
        let entry = self
            .entry(name)
            .ok_or_else(|| AppError::Archive(format!("no such entry: {}", name)))?;
        let text = String::from_utf8(entry.data.clone()).with_context(|| format!("chapter is not UTF-8: {}", name))?;
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }

    /// Chapter entry names in reading order
    pub fn chapter_paths(&self) -> Vec<String> {
        match self.spine_paths() {
            Ok(paths) if !paths.is_empty() => paths,
            Ok(_) => {
                warn!("Package spine lists no chapters, falling back to archive order");
                self.fallback_chapter_paths()
            }
            Err(e) => {
                warn!("Could not read package spine ({}), falling back to archive order", e);
                self.fallback_chapter_paths()
            }
        }
    }

    fn fallback_chapter_paths(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_dir)
            .filter(|entry| {
                let lower = entry.name.to_lowercase();
                CHAPTER_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
            })
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Package document path named by the container
    pub fn package_path(&self) -> Result<String> {
        let container = self.parse_xml_entry(CONTAINER_PATH)?;
        find_local(&container, "rootfile")
            .into_iter()
            .find_map(|id| container.element(id).and_then(|e| e.attribute("full-path")).map(str::to_string))
            .ok_or_else(|| AppError::Archive("container.xml has no rootfile".to_string()).into())
    }

    fn spine_paths(&self) -> Result<Vec<String>> {
        let package_path = self.package_path()?;
        let package = self.parse_xml_entry(&package_path)?;

        let mut manifest: HashMap<String, (String, String)> = HashMap::new();
        for id in find_local(&package, "item") {
            let Some(item) = package.element(id) else {
                continue;
            };
            if let (Some(item_id), Some(href)) = (item.attribute("id"), item.attribute("href")) {
                let media_type = item.attribute("media-type").unwrap_or_default().to_string();
                manifest.insert(item_id.to_string(), (href.to_string(), media_type));
            }
        }

        let mut paths = Vec::new();
        for id in find_local(&package, "itemref") {
            let Some(idref) = package.element(id).and_then(|e| e.attribute("idref")) else {
                continue;
            };
            let Some((href, media_type)) = manifest.get(idref) else {
                debug!("Spine references unknown manifest item {}", idref);
                continue;
            };
            if !CHAPTER_MEDIA_TYPES.contains(&media_type.as_str()) {
                continue;
            }
            let Some(path) = resolve_href(&package_path, href) else {
                warn!("Spine item {} has an unusable href {}", idref, href);
                continue;
            };
            if self.entry(&path).is_some() {
                paths.push(path);
            } else {
                warn!("Spine item {} points to missing entry {}", idref, path);
            }
        }
        Ok(paths)
    }

    fn parse_xml_entry(&self, name: &str) -> Result<Document> {
        let text = self.chapter_markup(name)?;
        let (_, body) = split_prolog(&text);
        Document::parse(body).map_err(|e| AppError::Archive(format!("{}: {}", name, e)).into())
    }

    /// Write the archive to `writer`, substituting the data of replaced entries
    pub fn write_to<W: Write + Seek>(&self, writer: W, replacements: &HashMap<String, Vec<u8>>) -> Result<W> {
        let mut zout = ZipWriter::new(writer);
        for ent in &self.entries {
            let data = replacements.get(&ent.name).unwrap_or(&ent.data);
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(ent.name.as_str(), opts)
                    .with_context(|| format!("add zip dir: {}", ent.name))?;
            } else {
                zout.start_file(ent.name.as_str(), opts)
                    .with_context(|| format!("start zip file: {}", ent.name))?;
                zout.write_all(data)
                    .with_context(|| format!("write zip file: {}", ent.name))?;
            }
        }
        zout.finish().map_err(|e| AppError::Archive(format!("finish zip: {}", e)).into())
    }

    pub fn write_with_replacements(&self, output_path: &Path, replacements: &HashMap<String, Vec<u8>>) -> Result<()> {
        let f = File::create(output_path).with_context(|| format!("create output epub: {}", output_path.display()))?;
        self.write_to(f, replacements)?;
        Ok(())
    }

    pub fn to_bytes_with_replacements(&self, replacements: &HashMap<String, Vec<u8>>) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()), replacements)?.into_inner())
    }
}

/// Elements whose local name (ignoring any namespace prefix) is `tag`
fn find_local(doc: &Document, tag: &str) -> Vec<NodeId> {
    doc.descendants(None)
        .into_iter()
        .filter(|&id| {
            doc.element(id).is_some_and(|element| {
                let local = element.name.rsplit(':').next().unwrap_or(&element.name);
                local.eq_ignore_ascii_case(tag)
            })
        })
        .collect()
}

/// Resolve a manifest href against the package document's path, as an entry name.
/// The fragment is dropped and percent escapes are decoded.
fn resolve_href(package_path: &str, href: &str) -> Option<String> {
    let url = ARCHIVE_ROOT.join(package_path).and_then(|package| package.join(href)).ok()?;
    let path = url.path().trim_start_matches('/');
    let decoded = urlencoding::decode(path).map(|p| p.into_owned()).unwrap_or_else(|_| path.to_string());
    Some(decoded)
}
