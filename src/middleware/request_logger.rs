//! Request logging middleware.
//!
//! The web client polls `/api/progress/{id}` about once a second for every
//! running process, so successful polls are logged at debug level only.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::StatusCode;
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLLING_PREFIX: &str = "/api/progress/";

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let polling = is_polling(&path);

        if polling {
            debug!(target: "api", method = %method, path = %path, "→ Request started");
        } else {
            let remote_addr = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();
            let user_agent = req
                .headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            info!(
                target: "api",
                method = %method,
                path = %path,
                query = %req.query_string(),
                remote_addr = %remote_addr,
                user_agent = %user_agent,
                "→ Request started"
            );
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            log_completion(&method, &path, res.status(), start.elapsed(), polling);
            Ok(res)
        })
    }
}

fn is_polling(path: &str) -> bool {
    path.starts_with(POLLING_PREFIX)
}

fn log_completion(method: &str, path: &str, status: StatusCode, elapsed: Duration, polling: bool) {
    let status_code = status.as_u16();
    let duration_ms = elapsed.as_millis();

    if status.is_success() && polling {
        debug!(
            target: "api",
            method = %method,
            path = %path,
            status = %status_code,
            duration_ms = %duration_ms,
            "← Request completed"
        );
    } else if status.is_success() {
        info!(
            target: "api",
            method = %method,
            path = %path,
            status = %status_code,
            duration_ms = %duration_ms,
            "← Request completed"
        );
    } else if status.is_client_error() {
        warn!(
            target: "api",
            method = %method,
            path = %path,
            status = %status_code,
            duration_ms = %duration_ms,
            "← Client error"
        );
    } else {
        warn!(
            target: "api",
            method = %method,
            path = %path,
            status = %status_code,
            duration_ms = %duration_ms,
            "← Server error"
        );
    }
}
