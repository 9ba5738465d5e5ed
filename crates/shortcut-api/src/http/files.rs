//! File uploads (`POST /files`, multipart/form-data).

use std::io::Read;
use std::path::Path;

use mime_guess::mime::Mime;
use multipart::client::lazy::Multipart;
use shortcut_core::entity::UploadedFile;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::http::client::{HttpClient, Method, RequestBody, decode};

const FILES_PATH: &str = "/files";

/// Guesses a MIME type from the file extension.
pub fn guess_content_type(path: &Path) -> Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}

/// Encodes one file as a `multipart/form-data` body.
///
/// Returns the `Content-Type` header value and the body.
pub(crate) fn encode_file_form(
    field: &str,
    filename: &str,
    content_type: Mime,
    data: &[u8],
) -> Result<(String, Vec<u8>)> {
    let mut form = Multipart::new();
    form.add_stream(field, data, Some(filename), Some(content_type));
    let mut prepared = form.prepare().map_err(|e| ApiError::Io(e.error))?;

    let header = format!("multipart/form-data; boundary={}", prepared.boundary());
    let mut body = Vec::with_capacity(data.len() + 256);
    prepared.read_to_end(&mut body)?;
    Ok((header, body))
}

impl HttpClient {
    pub(crate) fn upload_file_impl(&self, path: &Path) -> Result<UploadedFile> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment");
        debug!("uploading {} ({} bytes)", filename, data.len());

        let (content_type, bytes) =
            encode_file_form("file0", filename, guess_content_type(path), &data)?;

        let text = self.execute(
            Method::Post,
            FILES_PATH,
            &[],
            &RequestBody::Raw {
                content_type,
                bytes,
            },
        )?;
        let files: Vec<UploadedFile> = decode(FILES_PATH, &text)?;
        files
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::unexpected(FILES_PATH, "no file in upload response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn form_carries_one_file_part() {
        let (content_type, body) =
            encode_file_form("file0", "notes.txt", mime_guess::mime::TEXT_PLAIN, b"hello").unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        assert!(!boundary.is_empty());

        let body = String::from_utf8(body).unwrap();
        assert!(body.contains(&format!("--{}", boundary)));
        assert!(body.contains("name=\"file0\""));
        assert!(body.contains("filename=\"notes.txt\""));
        assert!(body.contains("Content-Type: text/plain"));
        assert!(body.contains("\r\n\r\nhello\r\n"));
        assert!(body.trim_end().ends_with(&format!("--{}--", boundary)));
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(guess_content_type(Path::new("x/shot.PNG")).essence_str(), "image/png");
        assert_eq!(guess_content_type(Path::new("doc.pdf")).essence_str(), "application/pdf");
        assert_eq!(
            guess_content_type(Path::new("noext")).essence_str(),
            "application/octet-stream"
        );
    }
}
