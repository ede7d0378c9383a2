/*!
 * Common test utilities for the epubzh test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub mod mock_translators;

/// Route library logs to the test output; `RUST_LOG` selects the level
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Wraps body markup in an XHTML chapter with declaration and doctype
pub fn xhtml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>Chapter</title></head>\
         <body>{}</body></html>",
        body
    )
}

/// Body of a table of contents: `links` anchors of five characters each
pub fn navigation_body(links: usize) -> String {
    (0..links)
        .map(|i| format!("<p><a href=\"ch{}.xhtml\">Ch {:02}</a></p>", i, i))
        .collect()
}

/// Builds EPUB archives in memory
pub struct EpubFixture {
    chapters: Vec<(String, String)>,
    extra: Vec<(String, String)>,
}

impl EpubFixture {
    pub fn new() -> Self {
        Self {
            chapters: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Add a chapter under `OEBPS/`; spine order follows insertion order
    pub fn chapter(mut self, file_name: &str, markup: impl Into<String>) -> Self {
        self.chapters.push((file_name.to_string(), markup.into()));
        self
    }

    /// Add a non-chapter resource under `OEBPS/`
    pub fn resource(mut self, file_name: &str, content: impl Into<String>) -> Self {
        self.extra.push((file_name.to_string(), content.into()));
        self
    }

    fn package_document(&self) -> String {
        let mut manifest = String::new();
        let mut spine = String::new();
        for (i, (name, _)) in self.chapters.iter().enumerate() {
            manifest.push_str(&format!(
                "<item id=\"c{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>",
                i, name
            ));
            spine.push_str(&format!("<itemref idref=\"c{}\"/>", i));
        }
        for (i, (name, _)) in self.extra.iter().enumerate() {
            manifest.push_str(&format!("<item id=\"r{}\" href=\"{}\" media-type=\"text/css\"/>", i, name));
        }
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\">\
             <metadata><dc:title xmlns:dc=\"http://purl.org/dc/elements/1.1/\">Fixture</dc:title></metadata>\
             <manifest>{}</manifest><spine>{}</spine></package>",
            manifest, spine
        )
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let container = "<?xml version=\"1.0\"?>\n\
            <container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\
            <rootfiles><rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/></rootfiles>\
            </container>";

        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zout.start_file("mimetype", stored)?;
        zout.write_all(b"application/epub+zip")?;
        zout.start_file("META-INF/container.xml", deflated)?;
        zout.write_all(container.as_bytes())?;
        zout.start_file("OEBPS/content.opf", deflated)?;
        zout.write_all(self.package_document().as_bytes())?;
        // Archive order is the reverse of spine order
        for (name, content) in self.chapters.iter().rev().chain(self.extra.iter()) {
            zout.start_file(format!("OEBPS/{}", name), deflated)?;
            zout.write_all(content.as_bytes())?;
        }
        Ok(zout.finish()?.into_inner())
    }

    pub fn write_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = dir.join(file_name);
        fs::write(&path, self.to_bytes()?)?;
        Ok(path)
    }
}

impl Default for EpubFixture {
    fn default() -> Self {
        Self::new()
    }
}
