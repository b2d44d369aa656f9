pub mod package;
pub mod xml;
