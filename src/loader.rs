//! Parses uploaded bytes of supported formats into a single UTF-8 string
//! and assigns a stable document identity.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::FileType;

/// Replace common PDF glyph-name artifacts with the characters they stand
/// for. `pdf-extract` occasionally emits glyph names instead of the
/// character itself when a font's encoding table is nonstandard.
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\u{2010}', "-")
        .replace('\u{2011}', "-")
        .replace('\u{2013}', "-")
        .replace('\u{2014}', "--")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace('\u{201C}', "\"")
        .replace('\u{201D}', "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\0', "")
}

/// Extract PDF text on a worker thread with a timeout, so a PDF with a
/// pathological font table cannot hang the request indefinitely.
fn extract_pdf_with_timeout(data: &[u8], timeout: Duration) -> Result<String> {
    let data_vec = data.to_vec();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let result = pdf_extract::extract_text_from_mem(&data_vec);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::parse_failed("document.pdf", e.to_string())),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::error!("pdf extraction timed out after {:?}", timeout);
            Err(Error::parse_failed("document.pdf", "pdf extraction timed out"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(Error::parse_failed("document.pdf", "pdf extraction thread crashed"))
        }
    }
}

fn parse_pdf(data: &[u8]) -> Result<String> {
    let raw = extract_pdf_with_timeout(data, Duration::from_secs(60))?;
    let cleaned = cleanup_pdf_text(&raw);
    let text = cleaned
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        return Err(Error::parse_failed("document.pdf", "no extractable text"));
    }
    Ok(text)
}

fn parse_docx(data: &[u8]) -> Result<String> {
    let doc = docx_rs::read_docx(data)
        .map_err(|e| Error::parse_failed("document.docx", e.to_string()))?;

    let mut content = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            content.push_str(&t.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    if content.trim().is_empty() {
        return Err(Error::parse_failed("document.docx", "no extractable text"));
    }
    Ok(content)
}

fn parse_plain_text(data: &[u8]) -> Result<String> {
    let text = String::from_utf8_lossy(data).to_string();
    if text.trim().is_empty() {
        return Err(Error::parse_failed("document", "no extractable text"));
    }
    Ok(text)
}

/// Hash content for document identity; truncated to a short readable
/// prefix since the full digest is not needed for collision resistance at
/// this scale.
fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// A successfully parsed upload.
pub struct ParsedDocument {
    pub text: String,
    pub document_id: String,
    pub file_type: FileType,
}

/// Validates and parses uploaded bytes. Stateless — every operation is a
/// pure function of its arguments and the allow-list/size-limit
/// configuration passed in.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Reject uploads whose extension is not on the allow-list or whose
    /// size exceeds the configured maximum.
    pub fn validate(
        filename: &str,
        size_bytes: u64,
        allowed_extensions: &[String],
        max_bytes: u64,
    ) -> Result<FileType> {
        let ext = extension_of(filename);
        let dotted_ext = format!(".{}", ext);
        if !allowed_extensions.iter().any(|e| e == &dotted_ext) {
            return Err(Error::UnsupportedFormat(ext));
        }

        if size_bytes > max_bytes {
            return Err(Error::TooLarge {
                size_mb: size_bytes as f64 / (1024.0 * 1024.0),
                limit_mb: max_bytes / (1024 * 1024),
            });
        }

        FileType::from_extension(&ext).ok_or(Error::UnsupportedFormat(ext))
    }

    /// Parse bytes into `(text, document_id)`. `document_id` is a
    /// deterministic hash of `(filename, sha256(bytes))`, so re-uploading
    /// identical bytes under the same name is idempotent.
    pub fn parse(filename: &str, bytes: &[u8]) -> Result<ParsedDocument> {
        let ext = extension_of(filename);
        let file_type = FileType::from_extension(&ext).ok_or_else(|| Error::UnsupportedFormat(ext))?;

        let text = match file_type {
            FileType::Pdf => parse_pdf(bytes)?,
            FileType::Docx => parse_docx(bytes)?,
            FileType::Txt | FileType::Markdown => parse_plain_text(bytes)?,
        };

        let document_id = document_id_for(filename, bytes);

        Ok(ParsedDocument {
            text,
            document_id,
            file_type,
        })
    }
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// `document_id = hash(filename, sha256(content))`, truncated to 24 hex
/// characters — short enough to be readable in logs, long enough that
/// collisions are not a practical concern at this scale.
fn document_id_for(filename: &str, bytes: &[u8]) -> String {
    let content_hash = hash_content(bytes);
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(content_hash.as_bytes());
    hex::encode(hasher.finalize())[..24].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec![".pdf".into(), ".md".into(), ".txt".into(), ".docx".into()]
    }

    #[test]
    fn rejects_unsupported_extension() {
        let err = DocumentLoader::validate("payload.exe", 10, &allowed(), 1_000_000).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_oversize_upload() {
        let err = DocumentLoader::validate("a.txt", 2_000_000, &allowed(), 1_000_000).unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }));
    }

    #[test]
    fn accepts_allow_listed_extension_within_size() {
        let file_type = DocumentLoader::validate("a.md", 10, &allowed(), 1_000_000).unwrap();
        assert_eq!(file_type, FileType::Markdown);
    }

    #[test]
    fn document_id_is_stable_and_depends_on_content() {
        let id_a = document_id_for("resume.pdf", b"hello");
        let id_b = document_id_for("resume.pdf", b"hello");
        let id_c = document_id_for("resume.pdf", b"goodbye");
        assert_eq!(id_a, id_b);
        assert_ne!(id_a, id_c);
    }

    #[test]
    fn parses_plain_text_upload() {
        let parsed = DocumentLoader::parse("notes.txt", b"hello world").unwrap();
        assert_eq!(parsed.text, "hello world");
        assert_eq!(parsed.file_type, FileType::Txt);
    }

    #[test]
    fn empty_text_upload_is_parse_failed() {
        let err = DocumentLoader::parse("notes.txt", b"   \n  ").unwrap_err();
        assert!(matches!(err, Error::ParseFailed { .. }));
    }
}
