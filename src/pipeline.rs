use std::collections::HashMap;
use std::path::Path;

use crate::chunker::plan_chunks;
use crate::client::{TextDomain, TranslationClient};
use crate::container::package::ContainerPackage;
use crate::container::xml::{structure_digest, XmlPart};
use crate::docx;
use crate::error::PipelineError;
use crate::executor::ChunkExecutor;
use crate::progress::ConsoleProgress;
use crate::xlsx;
use crate::xlsx::workbook::Workbook;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Xlsx,
}

impl DocumentFormat {
    /// Probe the container for its mandatory main part.
    pub fn detect(package: &ContainerPackage) -> Result<Self, PipelineError> {
        if package.has_entry(docx::MAIN_DOCUMENT_PART) {
            Ok(Self::Docx)
        } else if package.has_entry(xlsx::WORKBOOK_PART) {
            Ok(Self::Xlsx)
        } else {
            Err(PipelineError::InvalidContainer(
                "neither a Word nor a spreadsheet container".to_string(),
            ))
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("docx") => Some(Self::Docx),
            Some("xlsx") => Some(Self::Xlsx),
            _ => None,
        }
    }
}

/// Per-format chunk budgets. Paragraph units carry more context each than
/// cell units, hence the larger default.
#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions {
    pub docx_token_budget: usize,
    pub xlsx_token_budget: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            docx_token_budget: 2000,
            xlsx_token_budget: 1500,
        }
    }
}

/// One pipeline invocation per document: buffer in, buffer out. Chunks run
/// strictly sequentially; the document model is owned exclusively by the
/// invocation. The caller sees either a translated buffer (with failed
/// units retained verbatim) or a structural error, nothing in between.
pub struct DocumentPipeline<'a> {
    client: &'a dyn TranslationClient,
    options: PipelineOptions,
    progress: ConsoleProgress,
}

impl<'a> DocumentPipeline<'a> {
    pub fn new(
        client: &'a dyn TranslationClient,
        options: PipelineOptions,
        progress: ConsoleProgress,
    ) -> Self {
        Self {
            client,
            options,
            progress,
        }
    }

    /// Translate `input` into `target_lang`, probing the container format.
    pub fn translate(&self, input: &[u8], target_lang: &str) -> Result<Vec<u8>, PipelineError> {
        let package = ContainerPackage::from_bytes(input)?;
        let format = DocumentFormat::detect(&package)?;
        self.run(input, package, format, target_lang)
    }

    /// Translate with an explicit format instead of probing.
    pub fn translate_as(
        &self,
        input: &[u8],
        format: DocumentFormat,
        target_lang: &str,
    ) -> Result<Vec<u8>, PipelineError> {
        let package = ContainerPackage::from_bytes(input)?;
        self.run(input, package, format, target_lang)
    }

    fn run(
        &self,
        input: &[u8],
        package: ContainerPackage,
        format: DocumentFormat,
        target_lang: &str,
    ) -> Result<Vec<u8>, PipelineError> {
        match format {
            DocumentFormat::Docx => self.translate_docx(input, package, target_lang),
            DocumentFormat::Xlsx => self.translate_xlsx(input, package, target_lang),
        }
    }

    fn translate_docx(
        &self,
        input: &[u8],
        package: ContainerPackage,
        target_lang: &str,
    ) -> Result<Vec<u8>, PipelineError> {
        let entry = package.entry(docx::MAIN_DOCUMENT_PART).ok_or_else(|| {
            PipelineError::InvalidContainer(format!("missing {}", docx::MAIN_DOCUMENT_PART))
        })?;
        let mut part = XmlPart::parse(docx::MAIN_DOCUMENT_PART, &entry.data)?;
        let digest_before = structure_digest(&part);

        let units = docx::extract::extract_units(&part, 0);
        self.progress
            .info(format!("Extracted {} paragraph units", units.len()));
        if units.is_empty() {
            self.progress.info("No translatable text; keeping input");
            return Ok(input.to_vec());
        }
        let unit_count = units.len();

        let chunks = plan_chunks(units, self.options.docx_token_budget);
        self.progress.info(format!(
            "Planned {} chunks (budget {})",
            chunks.len(),
            self.options.docx_token_budget
        ));
        let executor = ChunkExecutor::new(self.client, &self.progress, TextDomain::Paragraphs);
        let result = executor.run(&chunks, target_lang);
        self.progress.info(format!(
            "Translated {}/{unit_count} units ({} failed)",
            result.len(),
            result.failed_units
        ));

        docx::apply::apply_units(&mut part, chunks.iter().flat_map(|c| &c.units), &result)?;
        if structure_digest(&part) != digest_before {
            return Err(PipelineError::Serialization(format!(
                "rewrite changed non-text structure in {}",
                docx::MAIN_DOCUMENT_PART
            )));
        }

        let mut replacements = HashMap::new();
        replacements.insert(docx::MAIN_DOCUMENT_PART.to_string(), part.to_bytes());
        package.to_bytes(&replacements)
    }

    fn translate_xlsx(
        &self,
        input: &[u8],
        package: ContainerPackage,
        target_lang: &str,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut workbook = Workbook::parse(&package)?;
        let units = xlsx::extract::extract_units(&workbook, 0);
        self.progress.info(format!(
            "Extracted {} cell units from {} sheets",
            units.len(),
            workbook.sheets.len()
        ));
        if units.is_empty() {
            self.progress.info("No translatable text; keeping input");
            return Ok(input.to_vec());
        }
        let unit_count = units.len();

        let chunks = plan_chunks(units, self.options.xlsx_token_budget);
        self.progress.info(format!(
            "Planned {} chunks (budget {})",
            chunks.len(),
            self.options.xlsx_token_budget
        ));
        let executor = ChunkExecutor::new(self.client, &self.progress, TextDomain::Cells);
        let result = executor.run(&chunks, target_lang);
        self.progress.info(format!(
            "Translated {}/{unit_count} units ({} failed)",
            result.len(),
            result.failed_units
        ));

        let outcome = xlsx::apply::apply_units(
            &mut workbook,
            chunks.iter().flat_map(|c| &c.units),
            &result,
        )?;

        let mut replacements = HashMap::new();
        for sheet_index in &outcome.changed_sheets {
            let sheet = &workbook.sheets[*sheet_index];
            replacements.insert(sheet.part_name.clone(), sheet.part.to_bytes());
        }
        if outcome.shared_changed {
            let part = workbook.shared.part.as_ref().ok_or_else(|| {
                PipelineError::Serialization(format!("missing {}", xlsx::SHARED_STRINGS_PART))
            })?;
            replacements.insert(xlsx::SHARED_STRINGS_PART.to_string(), part.to_bytes());
        }
        package.to_bytes(&replacements)
    }
}
