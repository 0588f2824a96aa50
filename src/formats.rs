//! Single-file outputs: JSON, HTML, Markdown and plain text.

use crate::epub::xml_escape;
use crate::model::{AcquisitionResult, BookMeta};
use scraper::{Html, Selector};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Epub,
    Json,
    Html,
    Markdown,
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Epub => "epub",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Text => "txt",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "epub" => Ok(OutputFormat::Epub),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(format!(
                "Invalid --format value: '{}'. Use epub, json, html, markdown, or text.",
                s
            )),
        }
    }
}

/// Errors from the single-file writers.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Cannot write: novel title is empty.")]
    EmptyTitle,

    #[error("Failed to create output file: {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn create(result: &AcquisitionResult, path: &Path) -> Result<BufWriter<File>, FormatError> {
    if result.novel_title.trim().is_empty() {
        return Err(FormatError::EmptyTitle);
    }
    let file = File::create(path).map_err(|e| FormatError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Plain text of a chapter fragment, one paragraph per block separated by blank lines.
pub(crate) fn body_to_plain_text(body: &str) -> String {
    let fragment = Html::parse_fragment(body);
    let paragraphs: Vec<String> = match Selector::parse("p") {
        Ok(p) => fragment
            .select(&p)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };
    if paragraphs.is_empty() {
        fragment.root_element().text().collect::<String>().trim().to_string()
    } else {
        paragraphs.join("\n\n")
    }
}

/// Write `{"novelTitle": ..., "chapters": [...]}`.
pub fn write_json(result: &AcquisitionResult, path: &Path) -> Result<(), FormatError> {
    let mut out = create(result, path)?;
    serde_json::to_writer_pretty(&mut out, result)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write one HTML page with a header and a section per chapter.
pub fn write_html(result: &AcquisitionResult, meta: &BookMeta, path: &Path) -> Result<(), FormatError> {
    let mut out = create(result, path)?;
    let title = xml_escape(&result.novel_title);

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, r#"<html lang="en">"#)?;
    writeln!(out, "<head>")?;
    writeln!(out, r#"  <meta charset="UTF-8"/>"#)?;
    writeln!(out, "  <title>{}</title>", title)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "  <header>")?;
    writeln!(out, "    <h1>{}</h1>", title)?;
    writeln!(out, r#"    <p class="author">By {}</p>"#, xml_escape(&meta.author))?;
    if let Some(d) = meta.description.as_deref() {
        writeln!(out, r#"    <p class="description">{}</p>"#, xml_escape(d))?;
    }
    writeln!(out, "  </header>")?;
    for (i, ch) in result.chapters.iter().enumerate() {
        writeln!(out, r#"  <section class="chapter" id="chapter-{}">"#, i + 1)?;
        writeln!(out, "    <h2>{}</h2>", xml_escape(&ch.display_title(i + 1)))?;
        writeln!(out, "{}", ch.content)?;
        writeln!(out, "  </section>")?;
    }
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    out.flush()?;
    Ok(())
}

/// Write Markdown: title, byline, then `## title` and the converted body per chapter.
pub fn write_markdown(
    result: &AcquisitionResult,
    meta: &BookMeta,
    path: &Path,
) -> Result<(), FormatError> {
    let mut out = create(result, path)?;
    writeln!(out, "# {}", result.novel_title)?;
    writeln!(out)?;
    writeln!(out, "By {}", meta.author)?;
    writeln!(out)?;
    if let Some(d) = meta.description.as_deref() {
        writeln!(out, "> {}", d)?;
        writeln!(out)?;
    }
    for (i, ch) in result.chapters.iter().enumerate() {
        writeln!(out, "---")?;
        writeln!(out)?;
        writeln!(out, "## {}", ch.display_title(i + 1))?;
        writeln!(out)?;
        writeln!(out, "{}", html2md::parse_html(&ch.content).trim())?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Write plain text with a numbered heading per chapter.
pub fn write_text(result: &AcquisitionResult, meta: &BookMeta, path: &Path) -> Result<(), FormatError> {
    let mut out = create(result, path)?;
    writeln!(out, "{}", result.novel_title)?;
    writeln!(out, "By {}", meta.author)?;
    if let Some(d) = meta.description.as_deref() {
        writeln!(out)?;
        writeln!(out, "{}", d)?;
    }
    for (i, ch) in result.chapters.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "=== {}. {} ===", i + 1, ch.display_title(i + 1))?;
        writeln!(out)?;
        writeln!(out, "{}", body_to_plain_text(&ch.content))?;
    }
    out.flush()?;
    Ok(())
}
