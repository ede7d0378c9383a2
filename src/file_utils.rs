use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Language tag of translated books
pub const TRANSLATED_TAG: &str = "zh";

/// Language tag of extracted source text
pub const SOURCE_TAG: &str = "en";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: `<stem>.<tag>.<extension>` inside output_dir
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        tag: &str,
        extension: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(tag);
        output_filename.push('.');
        output_filename.push_str(extension);

        output_dir.as_ref().join(output_filename)
    }

    /// Path of the translated book for `input_file`
    pub fn translated_epub_path<P1: AsRef<Path>, P2: AsRef<Path>>(input_file: P1, output_dir: P2) -> PathBuf {
        Self::generate_output_path(input_file, output_dir, TRANSLATED_TAG, "epub")
    }

    /// Path of the extracted text for `input_file`
    pub fn extracted_text_path<P1: AsRef<Path>, P2: AsRef<Path>>(input_file: P1, output_dir: P2) -> PathBuf {
        Self::generate_output_path(input_file, output_dir, SOURCE_TAG, "txt")
    }

    pub fn is_epub<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("epub"))
    }

    /// Whether the file is a book this tool already produced
    pub fn is_translated_output<P: AsRef<Path>>(path: P) -> bool {
        let suffix = format!(".{}.epub", TRANSLATED_TAG);
        path.as_ref()
            .file_name()
            .is_some_and(|name| name.to_string_lossy().to_lowercase().ends_with(&suffix))
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let normalized_ext = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(normalized_ext))
            {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }

    /// Source books under `dir`, leaving out translated outputs
    pub fn find_source_epubs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        Ok(Self::find_files(dir, "epub")?
            .into_iter()
            .filter(|path| !Self::is_translated_output(path))
            .collect())
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
