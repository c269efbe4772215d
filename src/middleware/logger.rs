use std::time::Instant;

use http::StatusCode;
use tracing::{error, info, warn, Level};

use super::{from_fn, Middleware};

/// Logs one line per request once the inner chain has finished.
pub fn logger() -> Middleware {
    from_fn(|ctx, next| {
        let start = Instant::now();
        next(ctx);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = ctx.status().unwrap_or(StatusCode::OK);
        let method = ctx.method().clone();
        let path = ctx.path();
        let request_id = ctx.request_id().unwrap_or("n/a");
        let status = status.as_u16();

        let level = level_for(status);
        if level == Level::ERROR {
            error!(%method, path, status, elapsed_ms, request_id, "request completed");
        } else if level == Level::WARN {
            warn!(%method, path, status, elapsed_ms, request_id, "request completed");
        } else {
            info!(%method, path, status, elapsed_ms, request_id, "request completed");
        }
    })
}

/// 5xx logs at error, 4xx at warn, everything else at info.
pub fn level_for(status: u16) -> Level {
    match status {
        500.. => Level::ERROR,
        400..=499 => Level::WARN,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_follows_status_class() {
        assert_eq!(level_for(200), Level::INFO);
        assert_eq!(level_for(302), Level::INFO);
        assert_eq!(level_for(404), Level::WARN);
        assert_eq!(level_for(500), Level::ERROR);
        assert_eq!(level_for(503), Level::ERROR);
    }
}
