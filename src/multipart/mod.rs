//! `multipart/form-data` encoding for staged files.
//!
//! Every file becomes one part under the same field name, in selection order.
//! The form only renders the framing (part headers and the closing delimiter);
//! transports interleave it with file content so large files never have to be
//! held in memory, and can still announce an exact `Content-Length` up front.

use crate::types::{FileContent, FileHandle};
use bytes::Bytes;
use mime::Mime;
use percent_encoding::percent_encode_byte;
use rand::distributions::Alphanumeric;
use rand::Rng;

const BOUNDARY_PREFIX: &str = "----UploadWidgetBoundary";
const BOUNDARY_RANDOM_LEN: usize = 24;
const PART_TRAILER: &[u8] = b"\r\n";

/// One file part of a multipart form.
#[derive(Clone, Debug)]
pub struct FormPart {
    field_name: String,
    content_type: Mime,
    file: FileHandle,
}

impl FormPart {
    /// Form field name.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// File name sent in `Content-Disposition`.
    pub fn file_name(&self) -> &str {
        self.file.name()
    }

    /// Part content type.
    pub fn content_type(&self) -> &Mime {
        &self.content_type
    }

    /// The staged file backing this part.
    pub fn file(&self) -> &FileHandle {
        &self.file
    }
}

/// Multipart form with one part per staged file.
#[derive(Clone, Debug)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Builds a form from files, all under `field_name`, keeping their order.
    pub fn new(field_name: &str, files: &[FileHandle]) -> Self {
        Self::with_boundary(field_name, files, generate_boundary())
    }

    /// Builds a form with a fixed boundary.
    pub fn with_boundary(field_name: &str, files: &[FileHandle], boundary: String) -> Self {
        let parts = files
            .iter()
            .map(|file| FormPart {
                field_name: field_name.to_string(),
                content_type: file
                    .content_type()
                    .cloned()
                    .unwrap_or_else(|| guess_content_type(file.name())),
                file: file.clone(),
            })
            .collect();

        Self { boundary, parts }
    }

    /// Boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parts in send order.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Value for the request `Content-Type` header.
    pub fn content_type_header(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Header block preceding the content of part `index`.
    pub fn part_header(&self, index: usize) -> Bytes {
        let part = &self.parts[index];
        Bytes::from(format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            self.boundary,
            part.field_name,
            escape_quoted(part.file_name()),
            part.content_type
        ))
    }

    /// Bytes following the content of every part.
    pub fn part_trailer(&self) -> Bytes {
        Bytes::from_static(PART_TRAILER)
    }

    /// Closing delimiter.
    pub fn closing(&self) -> Bytes {
        Bytes::from(format!("--{}--\r\n", self.boundary))
    }

    /// Exact encoded length of the whole body.
    pub fn content_length(&self) -> u64 {
        let framing: u64 = (0..self.parts.len())
            .map(|i| (self.part_header(i).len() + PART_TRAILER.len()) as u64)
            .sum();
        let content: u64 = self.parts.iter().map(|p| p.file.size()).sum();
        framing + content + self.closing().len() as u64
    }

    /// Encodes the whole body in memory.
    ///
    /// Returns `None` when a part is not backed by in-memory content.
    pub fn to_bytes(&self) -> Option<Bytes> {
        let mut body = Vec::with_capacity(self.content_length() as usize);
        for (i, part) in self.parts.iter().enumerate() {
            let FileContent::Bytes(content) = part.file.content() else {
                return None;
            };
            body.extend_from_slice(&self.part_header(i));
            body.extend_from_slice(content);
            body.extend_from_slice(PART_TRAILER);
        }
        body.extend_from_slice(&self.closing());
        Some(Bytes::from(body))
    }
}

fn generate_boundary() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", BOUNDARY_PREFIX, random)
}

/// Escapes a quoted header parameter the way browsers encode form file names.
fn escape_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\r' | '\n' => escaped.push_str(percent_encode_byte(c as u8)),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Guesses a content type from the file extension.
pub fn guess_content_type(file_name: &str) -> Mime {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        "webp" => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "tif" | "tiff" => "image/tiff".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "pdf" => mime::APPLICATION_PDF,
        "txt" => mime::TEXT_PLAIN,
        "csv" => mime::TEXT_CSV,
        "json" => mime::APPLICATION_JSON,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<FileHandle> {
        vec![
            FileHandle::from_bytes("first.png", "AAAA"),
            FileHandle::from_bytes("second.jpg", "BB"),
        ]
    }

    #[test]
    fn test_encoded_body_keeps_order() {
        let form = MultipartForm::with_boundary("file", &files(), "XYZ".to_string());
        let body = form.to_bytes().unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"first.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            AAAA\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"second.jpg\"\r\n\
            Content-Type: image/jpeg\r\n\r\n\
            BB\r\n\
            --XYZ--\r\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_content_length_matches_body() {
        let form = MultipartForm::new("file", &files());
        let body = form.to_bytes().unwrap();
        assert_eq!(form.content_length(), body.len() as u64);
    }

    #[test]
    fn test_content_type_header() {
        let form = MultipartForm::new("file", &files());
        let header = form.content_type_header();

        assert!(header.starts_with("multipart/form-data; boundary=----UploadWidgetBoundary"));
        assert_eq!(form.boundary().len(), BOUNDARY_PREFIX.len() + BOUNDARY_RANDOM_LEN);
    }

    #[test]
    fn test_file_name_escaping() {
        let file = FileHandle::from_bytes("we\"ird\r\nname.txt", "x");
        let form = MultipartForm::with_boundary("file", &[file], "B".to_string());
        let header = String::from_utf8(form.part_header(0).to_vec()).unwrap();

        assert!(header.contains("filename=\"we%22ird%0D%0Aname.txt\""));
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let file = FileHandle::from_bytes("data.bin", "x").with_content_type(mime::IMAGE_PNG);
        let form = MultipartForm::new("file", &[file]);
        assert_eq!(form.parts()[0].content_type(), &mime::IMAGE_PNG);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("photo.JPG"), mime::IMAGE_JPEG);
        assert_eq!(guess_content_type("doc.pdf"), mime::APPLICATION_PDF);
        assert_eq!(guess_content_type("image.webp").essence_str(), "image/webp");
        assert_eq!(guess_content_type("README"), mime::APPLICATION_OCTET_STREAM);
    }
}
