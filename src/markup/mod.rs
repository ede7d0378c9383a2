/*!
 * Chapter markup handling.
 *
 * - `dom`: permissive parser and serializer backed by a node arena
 * - `extractor`: paragraph extraction and navigation page detection
 * - `reinserter`: writing aligned translations back into the original structure
 */

pub mod dom;
pub mod extractor;
pub mod reinserter;

pub use dom::{Document, DocumentNode, Element, NodeId};
pub use extractor::{Extraction, ExtractionPolicy, LinkTextPolicy, TextBlock, extract_from_document, extract_text};
pub use reinserter::reinsert_translations;
