//! File serving for `Router::serve_static` mounts.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use http::StatusCode;
use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::context::Context;

/// Name of the wildcard parameter registered by `serve_static`.
pub const FILEPATH_PARAM: &str = "filepath";

/// Serves `root/<filepath>`; directories resolve to their `index.html`.
pub fn serve(ctx: &mut Context, root: &Path) {
    let raw = ctx.param(FILEPATH_PARAM).unwrap_or_default();
    let Ok(requested) = percent_decode_str(raw).decode_utf8() else {
        debug!(requested = %raw, "static path is not valid UTF-8");
        ctx.error_not_found("file not found");
        return;
    };
    let requested = requested.into_owned();
    let Some(relative) = sanitize(&requested) else {
        debug!(requested = %requested, "rejected static path");
        ctx.error_not_found("file not found");
        return;
    };

    let mut full_path = root.join(relative);
    if full_path.is_dir() {
        full_path.push("index.html");
    }

    match fs::read(&full_path) {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&full_path).first_or_octet_stream();
            ctx.write_bytes(StatusCode::OK, mime.as_ref(), &bytes);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => ctx.error_not_found("file not found"),
        Err(err) => ctx.abort_with_error(StatusCode::INTERNAL_SERVER_ERROR, err),
    }
}

/// Turns the decoded wildcard into a relative path, refusing traversal.
fn sanitize(requested: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for part in requested.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            part if part.contains('\\') || part.contains(':') => return None,
            part => relative.push(part),
        }
    }
    Some(relative)
}
