pub mod apply;
pub mod extract;

/// Part name of the main document body inside a docx container.
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";
