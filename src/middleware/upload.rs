//! Multipart upload middleware.
//!
//! `validator` parses the configured field, checks every file against the
//! allow-list using the sniffed content type (the client's declared type is
//! never trusted) and the per-file size limit, then stores the files under
//! `data_keys::UPLOADED_FILES` for the handler.

use http::{header, Method};
use mime::Mime;
use tracing::{debug, info, warn};

use super::{from_fn, Middleware};
use crate::{
    config::UploadConfig,
    constants::{data_keys, upload::DEFAULT_MAX_MEMORY},
    context::UploadedFile,
    errors::AppError,
};

pub fn validator(options: UploadConfig) -> Middleware {
    let allowed: Vec<Mime> = options
        .allowed_mime_types
        .iter()
        .filter_map(|raw| match raw.parse::<Mime>() {
            Ok(mime) => Some(mime),
            Err(err) => {
                warn!(mime = %raw, error = %err, "ignoring invalid allowed mime type");
                None
            }
        })
        .collect();

    from_fn(move |ctx, next| {
        let mut files = match ctx.multipart_files(&options.field, options.max_memory) {
            Ok(files) => files,
            Err(err) => {
                warn!(path = ctx.path(), error = %err, "multipart parsing failed");
                ctx.abort(err);
                return;
            }
        };
        if !options.multiple {
            files.truncate(1);
        }

        if let Err(err) = check_files(&files, &allowed, options.max_file_size) {
            warn!(path = ctx.path(), error = %err, "upload rejected");
            ctx.abort(err);
            return;
        }

        ctx.set(data_keys::UPLOADED_FILES, files);
        next(ctx);
    })
}

/// Content type first, then size, for each file in order.
pub fn check_files(files: &[UploadedFile], allowed: &[Mime], max_file_size: u64) -> Result<(), AppError> {
    for file in files {
        if let Some(declared) = &file.declared_content_type {
            if declared != file.content_type {
                debug!(
                    filename = %file.filename,
                    declared = %declared,
                    sniffed = file.content_type,
                    "declared content type differs from sniffed"
                );
            }
        }

        if !allowed.is_empty() && !allowed.iter().any(|mime| mime.essence_str() == file.content_type) {
            return Err(AppError::MimeNotAllowed(file.content_type.to_string()));
        }
        if max_file_size > 0 && file.size() > max_file_size {
            return Err(AppError::FileTooLarge(file.size()));
        }
    }
    Ok(())
}

/// Logs every file part of multipart `POST` requests. Never rejects.
pub fn logger() -> Middleware {
    from_fn(|ctx, next| {
        let is_multipart = ctx.method() == Method::POST
            && ctx
                .header(header::CONTENT_TYPE)
                .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            match ctx.multipart_all(DEFAULT_MAX_MEMORY) {
                Ok(files) => {
                    for file in &files {
                        info!(
                            field = %file.field,
                            filename = %file.filename,
                            size = file.size(),
                            content_type = file.content_type,
                            "upload received"
                        );
                    }
                }
                Err(err) => debug!(error = %err, "could not inspect multipart body"),
            }
        }
        next(ctx);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn file(data: &'static [u8]) -> UploadedFile {
        UploadedFile::new("file", "f.bin", None, Bytes::from_static(data))
    }

    #[test]
    fn allow_list_uses_sniffed_type() {
        let images = ["image/png".parse::<Mime>().unwrap()];
        assert!(check_files(&[file(PNG)], &images, 0).is_ok());

        let disguised = UploadedFile::new(
            "file",
            "cat.png",
            Some("image/png".to_string()),
            Bytes::from_static(b"<html><script>alert(1)</script>"),
        );
        assert!(matches!(
            check_files(&[disguised], &images, 0),
            Err(AppError::MimeNotAllowed(mime)) if mime == "text/html"
        ));
    }

    #[test]
    fn size_limit_applies_per_file() {
        assert!(matches!(
            check_files(&[file(PNG)], &[], 4),
            Err(AppError::FileTooLarge(16))
        ));
        assert!(check_files(&[file(PNG)], &[], 16).is_ok());
        assert!(check_files(&[file(PNG)], &[], 0).is_ok());
    }
}
