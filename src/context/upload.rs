//! Multipart file access on `Context`.
//!
//! The body is already buffered by the host, so multer's stream is fed a
//! single chunk and driven with a local executor inside the dispatch thread.

use std::{fs, io, path::Path};

use bytes::Bytes;
use http::header;
use tracing::debug;

use super::Context;
use crate::{
    constants::{data_keys, upload::SNIFF_LEN},
    errors::AppError,
};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    /// Content type claimed by the client in the part headers.
    pub declared_content_type: Option<String>,
    /// Content type detected from the leading bytes.
    pub content_type: &'static str,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        field: impl Into<String>,
        filename: impl Into<String>,
        declared_content_type: Option<String>,
        data: Bytes,
    ) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            declared_content_type,
            content_type: sniff_content_type(&data),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl Context {
    /// Parses the multipart body and returns the files sent under `field`.
    ///
    /// `max_memory` bounds the whole multipart stream. A request without any
    /// file in `field` is an error.
    pub fn multipart_files(&self, field: &str, max_memory: u64) -> Result<Vec<UploadedFile>, AppError> {
        let files = self.read_multipart(Some(field), max_memory)?;
        if files.is_empty() {
            return Err(AppError::Upload(format!("no file found in field '{field}'")));
        }
        debug!(field, count = files.len(), "parsed multipart files");
        Ok(files)
    }

    /// Every file part in the multipart body, whatever its field.
    pub fn multipart_all(&self, max_memory: u64) -> Result<Vec<UploadedFile>, AppError> {
        self.read_multipart(None, max_memory)
    }

    fn read_multipart(&self, field: Option<&str>, max_memory: u64) -> Result<Vec<UploadedFile>, AppError> {
        let content_type = self
            .header(header::CONTENT_TYPE)
            .ok_or_else(|| AppError::Upload("missing Content-Type header".to_string()))?;
        let boundary =
            multer::parse_boundary(content_type).map_err(|e| AppError::Upload(e.to_string()))?;

        let constraints = multer::Constraints::new()
            .size_limit(multer::SizeLimit::new().whole_stream(max_memory));
        let stream = futures::stream::iter([Ok::<Bytes, io::Error>(self.body.clone())]);
        let mut multipart = multer::Multipart::with_constraints(stream, boundary, constraints);

        futures::executor::block_on(async {
            let mut files = Vec::new();
            while let Some(part) = multipart
                .next_field()
                .await
                .map_err(|e| AppError::Upload(e.to_string()))?
            {
                let (Some(name), Some(filename)) = (part.name(), part.file_name()) else {
                    continue;
                };
                if field.is_some_and(|wanted| wanted != name) {
                    continue;
                }
                let name = name.to_string();
                let filename = filename.to_string();
                let declared = part.content_type().map(|m| m.essence_str().to_string());
                let data = part.bytes().await.map_err(|e| AppError::Upload(e.to_string()))?;
                files.push(UploadedFile::new(name, filename, declared, data));
            }
            Ok::<_, AppError>(files)
        })
    }

    /// Files validated by `middleware::upload::validator`; empty if it did not run.
    pub fn uploaded_files(&self) -> &[UploadedFile] {
        self.get::<Vec<UploadedFile>>(data_keys::UPLOADED_FILES)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Writes the file to `path`, creating parent directories as needed.
    pub fn save_file(&self, file: &UploadedFile, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, &file.data)
    }
}

/// Detects a MIME type from magic numbers in the first bytes of `data`.
/// Falls back to `text/plain` for control-free text and
/// `application/octet-stream` otherwise.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(SNIFF_LEN)];

    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b\x08", "application/x-gzip"),
        (b"OggS\x00", "application/ogg"),
        (b"ID3", "audio/mpeg"),
        (b"\x00\x00\x01\x00", "image/x-icon"),
    ];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| head.starts_with(magic)) {
        return *mime;
    }
    if head.len() >= 12 && &head[..4] == b"RIFF" {
        match &head[8..12] {
            b"WEBP" => return "image/webp",
            b"WAVE" => return "audio/wave",
            b"AVI " => return "video/avi",
            _ => {}
        }
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return "video/mp4";
    }

    let trimmed = head.trim_ascii_start();
    if trimmed.starts_with(b"<!DOCTYPE HTML") || trimmed.starts_with(b"<html") || trimmed.starts_with(b"<HTML") {
        return "text/html";
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml";
    }

    let is_binary = head
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b));
    if is_binary {
        "application/octet-stream"
    } else {
        "text/plain"
    }
}
