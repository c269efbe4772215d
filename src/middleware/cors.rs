use http::{header, Method, StatusCode};

use super::{from_fn, Middleware};
use crate::config::CorsConfig;

/// Adds CORS headers and answers preflight `OPTIONS` requests with 200.
///
/// Register it globally: preflight requests rarely match a route, and
/// global middleware also wraps the not-found handler.
pub fn cors(config: CorsConfig) -> Middleware {
    let any_origin = config.allowed_origins.iter().any(|o| o == "*");
    let methods = config.allowed_methods.join(", ");
    let headers = config.allowed_headers.join(", ");
    let origins = config.allowed_origins;
    let credentials = config.allow_credentials;

    from_fn(move |ctx, next| {
        let origin = ctx
            .header(header::ORIGIN)
            .filter(|origin| any_origin || origins.iter().any(|o| o == origin))
            .map(str::to_owned);

        if let Some(origin) = origin {
            // "*" is not valid together with credentials, echo the origin instead
            let allow = if any_origin && !credentials { "*" } else { origin.as_str() };
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow);
            if !any_origin || credentials {
                ctx.append_header(header::VARY, "Origin");
            }
            if credentials {
                ctx.set_header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
            }
        }
        ctx.set_header(header::ACCESS_CONTROL_ALLOW_METHODS, &methods);
        ctx.set_header(header::ACCESS_CONTROL_ALLOW_HEADERS, &headers);

        if ctx.method() == Method::OPTIONS {
            ctx.write_status(StatusCode::OK);
            return;
        }
        next(ctx);
    })
}
