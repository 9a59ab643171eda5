//! Text extraction for OOXML containers (.docx and .pptx).
//!
//! Both formats are ZIP archives of XML parts. Word documents keep all
//! body text in `word/document.xml` (`<w:t>` runs inside `<w:p>`
//! paragraphs); slide decks keep one part per slide under `ppt/slides/`
//! (`<a:t>` runs inside `<a:p>` paragraphs, shape by shape). We stream
//! the XML and collect text runs, emitting one line per paragraph and
//! skipping paragraphs that contain no text.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::{DocumentFormat, ExtractError};

/// Extract paragraph text from a Word document, in document order.
pub(crate) fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_archive_part(bytes, "word/document.xml", DocumentFormat::Docx)?;
    collect_text_runs(&xml, DocumentFormat::Docx)
}

/// Extract text from every slide of a deck, slide order then shape order.
pub(crate) fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes, DocumentFormat::Pptx)?;

    // Slide parts are named slide1.xml, slide2.xml, ... but the archive
    // does not guarantee entry order, so sort by slide number.
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let stem = name
                .strip_prefix("ppt/slides/slide")
                .and_then(|rest| rest.strip_suffix(".xml"))?;
            stem.parse::<u32>().ok().map(|n| (n, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut text = String::new();
    for (_, name) in slides {
        let mut xml = String::new();
        archive
            .by_name(&name)
            .map_err(|e| ExtractError::parse(DocumentFormat::Pptx, e))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractError::parse(DocumentFormat::Pptx, e))?;
        text.push_str(&collect_text_runs(&xml, DocumentFormat::Pptx)?);
    }
    Ok(text)
}

fn open_archive(
    bytes: &[u8],
    format: DocumentFormat,
) -> Result<zip::ZipArchive<Cursor<&[u8]>>, ExtractError> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::parse(format, e))
}

fn read_archive_part(
    bytes: &[u8],
    part: &str,
    format: DocumentFormat,
) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes, format)?;
    let mut xml = String::new();
    archive
        .by_name(part)
        .map_err(|e| ExtractError::parse(format, e))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::parse(format, e))?;
    Ok(xml)
}

/// Walk the XML stream, appending the contents of `<w:t>`/`<a:t>` runs.
/// Paragraph ends (`</w:p>`/`</a:p>`) become newlines; paragraphs with no
/// text are dropped.
fn collect_text_runs(xml: &str, format: DocumentFormat) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut paragraph = String::new();
    let mut in_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" => {
                    if !paragraph.trim().is_empty() {
                        out.push_str(&paragraph);
                        out.push('\n');
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_run => {
                let run = t.unescape().map_err(|e| ExtractError::parse(format, e))?;
                paragraph.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ExtractError::parse(format, e)),
        }
    }

    // Text runs outside any paragraph (unusual, but valid XML-wise).
    if !paragraph.trim().is_empty() {
        out.push_str(&paragraph);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_archive(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, content) in parts {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn docx_paragraphs_in_document_order() {
        let document = r#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
                <w:p><w:r><w:t></w:t></w:r></w:p>
                <w:p><w:r><w:t>Second </w:t></w:r><w:r><w:t>paragraph</w:t></w:r></w:p>
              </w:body>
            </w:document>"#;
        let bytes = build_archive(&[("word/document.xml", document)]);

        let text = extract_docx(&bytes).unwrap();
        assert_eq!(text, "First paragraph\nSecond paragraph\n");
    }

    #[test]
    fn docx_unescapes_entities() {
        let document = r#"<w:document xmlns:w="urn:w">
            <w:p><w:t>CV &amp; cover letter</w:t></w:p>
            </w:document>"#;
        let bytes = build_archive(&[("word/document.xml", document)]);

        let text = extract_docx(&bytes).unwrap();
        assert_eq!(text, "CV & cover letter\n");
    }

    #[test]
    fn docx_missing_document_part_is_parse_error() {
        let bytes = build_archive(&[("word/styles.xml", "<styles/>")]);
        let err = extract_docx(&bytes).unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }

    #[test]
    fn docx_non_zip_bytes_are_parse_error() {
        let err = extract_docx(b"definitely not a zip file").unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }

    #[test]
    fn pptx_slides_sorted_numerically() {
        let slide = |text: &str| {
            format!(
                r#"<p:sld xmlns:p="urn:p" xmlns:a="urn:a">
                    <p:sp><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:sp>
                   </p:sld>"#
            )
        };
        // slide10 before slide2 in archive order: numeric sort must win
        let s10 = slide("slide ten");
        let s2 = slide("slide two");
        let s1 = slide("slide one");
        let bytes = build_archive(&[
            ("ppt/slides/slide10.xml", s10.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
        ]);

        let text = extract_pptx(&bytes).unwrap();
        assert_eq!(text, "slide one\nslide two\nslide ten\n");
    }

    #[test]
    fn pptx_multiple_shapes_per_slide() {
        let slide = r#"<p:sld xmlns:p="urn:p" xmlns:a="urn:a">
            <p:sp><a:p><a:t>Title</a:t></a:p></p:sp>
            <p:sp><a:p><a:t>Body text</a:t></a:p></p:sp>
           </p:sld>"#;
        let bytes = build_archive(&[("ppt/slides/slide1.xml", slide)]);

        let text = extract_pptx(&bytes).unwrap();
        assert_eq!(text, "Title\nBody text\n");
    }
}
