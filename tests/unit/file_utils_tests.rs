/*!
 * Tests for file utilities
 */

use epubzh::file_utils::FileManager;

use crate::common::create_temp_dir;

#[test]
fn test_write_to_file_should_create_missing_parents() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("a/b/book.en.txt");

    FileManager::write_to_file(&path, "Chapter one.").unwrap();
    assert!(FileManager::file_exists(&path));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Chapter one.");
}

#[test]
fn test_find_files_should_match_extension_case_insensitively() {
    let dir = create_temp_dir().unwrap();
    for name in ["one.EPUB", "two.epub", "three.pdf"] {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }
    let found = FileManager::find_files(dir.path(), ".epub").unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_ensure_dir_should_be_idempotent() {
    let dir = create_temp_dir().unwrap();
    let nested = dir.path().join("out");
    FileManager::ensure_dir(&nested).unwrap();
    FileManager::ensure_dir(&nested).unwrap();
    assert!(FileManager::dir_exists(&nested));
}
