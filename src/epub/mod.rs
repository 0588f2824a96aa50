//! EPUB 3 writer. Packages an [AcquisitionResult] as mimetype, container, OPF, nav document,
//! optional visible contents page, stylesheet and one XHTML file per chapter.
//!
//! Chapter content is inserted as-is; the extractor already emits XHTML-safe fragments.

use crate::model::{AcquisitionResult, BookMeta};
use crate::scraper::is_xml_char;
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";
const XHTML: &str = "application/xhtml+xml";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const STYLESHEET: &str = r#"body { font-family: serif; line-height: 1.5; margin: 0 5%; }
h1, h2 { text-align: center; }
.chapter p { text-indent: 1.2em; margin: 0 0 0.6em 0; }
"#;

/// Errors from the EPUB writer.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: novel title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: no chapters were acquired.")]
    NoChapters,

    #[error("Failed to create EPUB file: {path}: {source}")]
    CreateFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

/// One file in the package besides mimetype, container and OPF.
struct Entry {
    id: String,
    href: String,
    media_type: &'static str,
    properties: Option<&'static str>,
    /// Part of the reading order.
    in_spine: bool,
    body: String,
}

/// Write the novel to an EPUB file at `path`. Set `include_toc_page` to add a visible
/// contents page before the first chapter.
pub fn write_epub(
    result: &AcquisitionResult,
    meta: &BookMeta,
    path: &Path,
    include_toc_page: bool,
) -> Result<(), EpubError> {
    validate(result)?;
    let file = std::fs::File::create(path).map_err(|e| EpubError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_epub_to(result, meta, file, include_toc_page)?;
    tracing::debug!(path = %path.display(), chapters = result.chapters.len(), "epub written");
    Ok(())
}

/// Write the archive into any seekable writer and hand it back.
pub fn write_epub_to<W: Write + Seek>(
    result: &AcquisitionResult,
    meta: &BookMeta,
    writer: W,
    include_toc_page: bool,
) -> Result<W, EpubError> {
    validate(result)?;
    let mut zip = ZipWriter::new(writer);
    let stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let deflated = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // mimetype must be the first entry and uncompressed.
    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE)?;
    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    let entries = package_entries(result, include_toc_page);
    zip.start_file(format!("{}content.opf", OEBPS_PREFIX), deflated)?;
    zip.write_all(package_document(result, meta, &entries).as_bytes())?;
    for entry in &entries {
        zip.start_file(format!("{}{}", OEBPS_PREFIX, entry.href), deflated)?;
        zip.write_all(entry.body.as_bytes())?;
    }
    Ok(zip.finish()?)
}

fn validate(result: &AcquisitionResult) -> Result<(), EpubError> {
    if result.novel_title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if result.chapters.is_empty() {
        return Err(EpubError::NoChapters);
    }
    Ok(())
}

fn package_entries(result: &AcquisitionResult, include_toc_page: bool) -> Vec<Entry> {
    let contents: Vec<(String, String)> = result
        .chapters
        .iter()
        .enumerate()
        .map(|(i, ch)| (chapter_href(i + 1), ch.display_title(i + 1)))
        .collect();

    let mut entries = vec![
        Entry {
            id: "nav".to_string(),
            href: "nav.xhtml".to_string(),
            media_type: XHTML,
            properties: Some("nav"),
            in_spine: false,
            body: nav_document(&contents),
        },
        Entry {
            id: "style".to_string(),
            href: "style.css".to_string(),
            media_type: "text/css",
            properties: None,
            in_spine: false,
            body: STYLESHEET.to_string(),
        },
    ];
    if include_toc_page {
        entries.push(Entry {
            id: "toc-page".to_string(),
            href: "toc.xhtml".to_string(),
            media_type: XHTML,
            properties: None,
            in_spine: true,
            body: xhtml_page("Table of Contents", &contents_list(&result.novel_title, &contents)),
        });
    }
    for (i, ch) in result.chapters.iter().enumerate() {
        let title = ch.display_title(i + 1);
        let body = format!(
            "<div class=\"chapter\">\n<h2>{}</h2>\n{}\n</div>",
            xml_escape(&title),
            ch.content
        );
        entries.push(Entry {
            id: format!("chapter-{}", i + 1),
            href: chapter_href(i + 1),
            media_type: XHTML,
            properties: None,
            in_spine: true,
            body: xhtml_page(&title, &body),
        });
    }
    entries
}

fn chapter_href(number: usize) -> String {
    format!("chapter-{}.xhtml", number)
}

fn identifier(result: &AcquisitionResult, meta: &BookMeta) -> String {
    match meta.source_url.as_deref() {
        Some(url) if !url.trim().is_empty() => url.to_string(),
        _ => format!("urn:novelscrape:{}", result.novel_title.trim()),
    }
}

fn package_document(result: &AcquisitionResult, meta: &BookMeta, entries: &[Entry]) -> String {
    let mut metadata = format!(
        "    <dc:identifier id=\"book-id\">{}</dc:identifier>\n    <dc:title>{}</dc:title>\n    <dc:creator>{}</dc:creator>\n    <dc:language>en</dc:language>\n",
        xml_escape(&identifier(result, meta)),
        xml_escape(&result.novel_title),
        xml_escape(&meta.author),
    );
    if let Some(description) = meta.description.as_deref().filter(|d| !d.trim().is_empty()) {
        metadata.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            xml_escape(description)
        ));
    }
    if let Some(source) = meta.source_url.as_deref() {
        metadata.push_str(&format!("    <dc:source>{}</dc:source>\n", xml_escape(source)));
    }

    let manifest: String = entries
        .iter()
        .map(|e| {
            let properties = e
                .properties
                .map(|p| format!(" properties=\"{}\"", p))
                .unwrap_or_default();
            format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
                e.id, e.href, e.media_type, properties
            )
        })
        .collect();
    let spine: String = entries
        .iter()
        .filter(|e| e.in_spine)
        .map(|e| format!("    <itemref idref=\"{}\"/>\n", e.id))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
{metadata}  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine>
{spine}  </spine>
</package>
"#
    )
}

fn contents_items(contents: &[(String, String)]) -> String {
    contents
        .iter()
        .map(|(href, title)| format!("      <li><a href=\"{}\">{}</a></li>\n", href, xml_escape(title)))
        .collect()
}

fn nav_document(contents: &[(String, String)]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="en" lang="en">
<head>
  <meta charset="UTF-8"/>
  <title>Contents</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>Contents</h1>
    <ol>
{}    </ol>
  </nav>
</body>
</html>
"#,
        contents_items(contents)
    )
}

fn contents_list(novel_title: &str, contents: &[(String, String)]) -> String {
    format!(
        "<h1>{}</h1>\n<ol>\n{}</ol>",
        xml_escape(novel_title),
        contents_items(contents)
    )
}

fn xhtml_page(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">
<head>
  <meta charset="UTF-8"/>
  <title>{}</title>
  <link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
{}
</body>
</html>
"#,
        xml_escape(title),
        body
    )
}

pub(crate) fn xml_escape(s: &str) -> String {
    s.chars()
        .filter(|c| is_xml_char(*c))
        .collect::<String>()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Chapter;
    use std::io::{Cursor, Read};
    use zip::read::ZipArchive;

    fn sample() -> AcquisitionResult {
        AcquisitionResult {
            novel_title: "Tom & Jerry's Novel".to_string(),
            chapters: vec![
                Chapter {
                    title: "Chapter 1: <Begin>".to_string(),
                    content: "<p>First paragraph.</p>".to_string(),
                },
                Chapter {
                    title: String::new(),
                    content: "<p>Second chapter body.</p>".to_string(),
                },
            ],
        }
    }

    fn meta() -> BookMeta {
        BookMeta {
            description: Some("A cat and a mouse.".to_string()),
            source_url: Some("https://example.com/novel/tom-and-jerry".to_string()),
            ..BookMeta::default()
        }
    }

    fn build(toc_page: bool) -> ZipArchive<Cursor<Vec<u8>>> {
        let cursor = write_epub_to(&sample(), &meta(), Cursor::new(Vec::new()), toc_page).unwrap();
        ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap()
    }

    fn read(zip: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut s = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn mimetype_is_first_and_stored() {
        let mut zip = build(true);
        let first = zip.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), zip::CompressionMethod::Stored);
        drop(first);
        assert_eq!(read(&mut zip, "mimetype"), "application/epub+zip");
    }

    #[test]
    fn archive_layout() {
        let zip = build(true);
        let names: Vec<&str> = zip.file_names().collect();
        for expected in [
            "META-INF/container.xml",
            "OEBPS/content.opf",
            "OEBPS/nav.xhtml",
            "OEBPS/style.css",
            "OEBPS/toc.xhtml",
            "OEBPS/chapter-1.xhtml",
            "OEBPS/chapter-2.xhtml",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn package_metadata_and_spine_order() {
        let mut zip = build(true);
        let opf = read(&mut zip, "OEBPS/content.opf");
        assert!(opf.contains("<dc:title>Tom &amp; Jerry&apos;s Novel</dc:title>"));
        assert!(opf.contains("<dc:creator>Web Novel</dc:creator>"));
        assert!(opf.contains("<dc:description>A cat and a mouse.</dc:description>"));
        assert!(opf.contains(">https://example.com/novel/tom-and-jerry</dc:identifier>"));
        assert!(opf.contains(r#"properties="nav""#));
        let toc = opf.find(r#"<itemref idref="toc-page"/>"#).unwrap();
        let first = opf.find(r#"<itemref idref="chapter-1"/>"#).unwrap();
        let second = opf.find(r#"<itemref idref="chapter-2"/>"#).unwrap();
        assert!(toc < first && first < second);
        assert!(!opf.contains(r#"<itemref idref="nav"/>"#));
    }

    #[test]
    fn chapters_are_wrapped_and_titled() {
        let mut zip = build(false);
        let first = read(&mut zip, "OEBPS/chapter-1.xhtml");
        assert!(first.contains("<div class=\"chapter\">"));
        assert!(first.contains("<h2>Chapter 1: &lt;Begin&gt;</h2>"));
        assert!(first.contains("<p>First paragraph.</p>"));
        let second = read(&mut zip, "OEBPS/chapter-2.xhtml");
        assert!(second.contains("<title>Chapter 2</title>"));
        let nav = read(&mut zip, "OEBPS/nav.xhtml");
        assert!(nav.contains(r#"<a href="chapter-2.xhtml">Chapter 2</a>"#));
    }

    #[test]
    fn toc_page_can_be_omitted() {
        let mut zip = build(false);
        assert!(!zip.file_names().any(|n| n == "OEBPS/toc.xhtml"));
        let opf = read(&mut zip, "OEBPS/content.opf");
        assert!(!opf.contains("toc-page"));
    }

    #[test]
    fn identifier_falls_back_to_urn() {
        let id = identifier(&sample(), &BookMeta::default());
        assert_eq!(id, "urn:novelscrape:Tom & Jerry's Novel");
    }

    #[test]
    fn escape_drops_characters_xml_forbids() {
        assert_eq!(xml_escape("Bell\u{0007}\u{000C} & \"co\""), "Bell &amp; &quot;co&quot;");
        assert_eq!(xml_escape("tab\there"), "tab\there");
    }

    #[test]
    fn rejects_empty_title_and_no_chapters() {
        let mut result = sample();
        result.novel_title = "  ".to_string();
        let err = write_epub_to(&result, &meta(), Cursor::new(Vec::new()), true);
        assert!(matches!(err, Err(EpubError::EmptyTitle)));

        let mut result = sample();
        result.chapters.clear();
        let path = std::env::temp_dir().join("novelscrape_epub_void.epub");
        assert!(matches!(
            write_epub(&result, &meta(), &path, true),
            Err(EpubError::NoChapters)
        ));
    }

    #[test]
    fn write_epub_creates_file() {
        let path = std::env::temp_dir().join(format!("novelscrape_epub_{}.epub", std::process::id()));
        write_epub(&sample(), &meta(), &path, true).unwrap();
        let zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert!(zip.file_names().any(|n| n == "OEBPS/chapter-2.xhtml"));
        std::fs::remove_file(&path).ok();
    }
}
