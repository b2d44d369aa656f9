pub mod chunker;
pub mod client;
pub mod config;
pub mod container;
pub mod docx;
pub mod error;
pub mod executor;
pub mod ir;
pub mod pipeline;
pub mod progress;
pub mod textutil;
pub mod xlsx;

#[cfg(test)]
pub mod testutil;

pub use client::{GeminiClient, TextDomain, TranslationClient};
pub use error::{ClientError, PipelineError};
pub use pipeline::{DocumentFormat, DocumentPipeline, PipelineOptions};
