//! The thumbnail endpoint.
//!
//! Everything is driven by request headers:
//!
//! | Header          | Meaning                                                  |
//! |-----------------|----------------------------------------------------------|
//! | `RemoteUrl`     | Image to fetch. Without it the service banner is served. |
//! | `LongSidePx`    | Target long side, default 480, capped by configuration.  |
//! | `Quality`       | JPEG quality, clamped to 10..=100, default 90.           |
//! | `Authorization` | Forwarded verbatim to the origin.                        |

use std::ops::RangeInclusive;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use thumbnail_pipeline::ThumbnailRequest;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::server::AppState;

pub const SERVER_BANNER: &str = "Image Proxy Service";

pub const REMOTE_URL_HEADER: &str = "RemoteUrl";
pub const LONG_SIDE_PX_HEADER: &str = "LongSidePx";
pub const QUALITY_HEADER: &str = "Quality";

/// Qualities accepted from callers
pub const QUALITY_RANGE: RangeInclusive<i32> = 10..=100;

/// Size and quality requested through headers, defaults applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailParams {
    pub long_side_px: i32,
    pub quality: i32,
}

impl ThumbnailParams {
    pub fn from_headers(headers: &HeaderMap, config: &ProxyConfig) -> Self {
        let long_side_px = header_int(headers, LONG_SIDE_PX_HEADER).unwrap_or(config.default_long_side_px);
        let quality = header_int(headers, QUALITY_HEADER)
            .map(|q| q.clamp(*QUALITY_RANGE.start(), *QUALITY_RANGE.end()))
            .unwrap_or(config.default_quality);

        Self { long_side_px, quality }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn header_int(headers: &HeaderMap, name: &str) -> Option<i32> {
    header_str(headers, name).and_then(|value| value.trim().parse().ok())
}

/// GET /
pub async fn thumbnail(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ProxyError> {
    let Some(remote_url) = headers.get(REMOTE_URL_HEADER) else {
        return Ok(SERVER_BANNER.into_response());
    };
    let remote_url = remote_url.to_str().map_err(|_| ProxyError::InvalidRemoteUrl)?;

    let params = ThumbnailParams::from_headers(&headers, &state.config);
    if params.long_side_px > state.config.max_long_side_px {
        return Err(ProxyError::LongSideTooLarge {
            requested: params.long_side_px,
            max: state.config.max_long_side_px,
        });
    }

    tracing::debug!(
        remote_url,
        long_side_px = params.long_side_px,
        quality = params.quality,
        "Fetching source image"
    );
    let source = state
        .origin
        .fetch(remote_url, headers.get(header::AUTHORIZATION))
        .await?;

    let thumbnailer = state.thumbnailer;
    let source_len = source.len();
    let jpeg = state
        .workers
        .run(move || {
            thumbnailer.process(&ThumbnailRequest {
                source: &source[..],
                long_side_px: params.long_side_px,
                quality: params.quality,
            })
        })
        .await??;

    tracing::debug!(source_bytes = source_len, thumbnail_bytes = jpeg.len(), "Thumbnail created");

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{HeaderValue, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use tower::ServiceExt;

    use crate::server::create_router;

    const TOKEN: &str = "Bearer open-sesame";

    fn source_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    /// In-process origin server; returns its base URL and a hit counter
    async fn spawn_origin() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let png = source_png(640, 480);

        let counter = Arc::clone(&hits);
        let app = Router::new()
            .route(
                "/photo.png",
                get(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let png = png.clone();
                    async move { ([(header::CONTENT_TYPE, "image/png")], png) }
                }),
            )
            .route(
                "/private.png",
                get(|headers: HeaderMap| async move {
                    if header_str(&headers, "authorization") == Some(TOKEN) {
                        source_png(300, 600).into_response()
                    } else {
                        (StatusCode::UNAUTHORIZED, "token required").into_response()
                    }
                }),
            )
            .route(
                "/slow.png",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    StatusCode::NO_CONTENT
                }),
            )
            .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }))
            .route("/notes.txt", get(|| async { "this is not an image" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), hits)
    }

    fn test_config() -> ProxyConfig {
        ProxyConfig {
            worker_threads: 2,
            ..ProxyConfig::default()
        }
    }

    async fn call(headers: &[(&str, &str)]) -> (StatusCode, HeaderMap, Vec<u8>) {
        call_with(test_config(), headers).await
    }

    async fn call_with(config: ProxyConfig, headers: &[(&str, &str)]) -> (StatusCode, HeaderMap, Vec<u8>) {
        let mut request = Request::builder().uri("/");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        send(config, request.body(Body::empty()).unwrap()).await
    }

    async fn send(config: ProxyConfig, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = create_router(AppState::new(config).unwrap())
            .oneshot(request)
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    fn jpeg_dimensions(body: &[u8]) -> (u32, u32) {
        let image = image::load_from_memory_with_format(body, ImageFormat::Jpeg).unwrap();
        (image.width(), image.height())
    }

    #[test]
    fn test_params_defaults_and_clamping() {
        let config = ProxyConfig::default();
        let mut headers = HeaderMap::new();
        assert_eq!(
            ThumbnailParams::from_headers(&headers, &config),
            ThumbnailParams { long_side_px: 480, quality: 90 }
        );

        headers.insert("longsidepx", HeaderValue::from_static("1024"));
        headers.insert("quality", HeaderValue::from_static("3"));
        assert_eq!(
            ThumbnailParams::from_headers(&headers, &config),
            ThumbnailParams { long_side_px: 1024, quality: 10 }
        );

        headers.insert("quality", HeaderValue::from_static("250"));
        headers.insert("longsidepx", HeaderValue::from_static("-20"));
        assert_eq!(
            ThumbnailParams::from_headers(&headers, &config),
            ThumbnailParams { long_side_px: -20, quality: 100 }
        );

        headers.insert("quality", HeaderValue::from_static("high"));
        headers.insert("longsidepx", HeaderValue::from_static("12.5"));
        assert_eq!(
            ThumbnailParams::from_headers(&headers, &config),
            ThumbnailParams { long_side_px: 480, quality: 90 }
        );
    }

    #[tokio::test]
    async fn test_banner_without_remote_url() {
        let (status, _, body) = call(&[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SERVER_BANNER.as_bytes());
    }

    #[tokio::test]
    async fn test_default_thumbnail() {
        let (origin, hits) = spawn_origin().await;
        let url = format!("{origin}/photo.png");

        let (status, headers, body) = call(&[("RemoteUrl", &url)]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(jpeg_dimensions(&body), (480, 360));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_requested_size_and_quality() {
        let (origin, _) = spawn_origin().await;
        let url = format!("{origin}/photo.png");

        let (status, _, small) = call(&[("RemoteUrl", &url), ("LongSidePx", "100"), ("Quality", "10")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(jpeg_dimensions(&small), (100, 75));

        let (_, _, large) = call(&[("RemoteUrl", &url), ("LongSidePx", "100"), ("Quality", "100")]).await;
        assert!(large.len() > small.len());
    }

    #[tokio::test]
    async fn test_oversized_request_is_rejected_before_fetching() {
        let (origin, hits) = spawn_origin().await;
        let url = format!("{origin}/photo.png");

        let (status, _, body) = call(&[("RemoteUrl", &url), ("LongSidePx", "4096")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"LongSidePx size must be lower than 2048 pixels: 4096");
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let (status, _, body) = call(&[("RemoteUrl", &url), ("LongSidePx", "2048")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(jpeg_dimensions(&body), (2048, 1536));
    }

    #[tokio::test]
    async fn test_authorization_is_forwarded() {
        let (origin, _) = spawn_origin().await;
        let url = format!("{origin}/private.png");

        let (status, _, body) = call(&[("RemoteUrl", &url), ("Authorization", TOKEN)]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(jpeg_dimensions(&body), (240, 480));
    }

    #[tokio::test]
    async fn test_origin_unauthorized_is_relayed() {
        let (origin, _) = spawn_origin().await;
        let url = format!("{origin}/private.png");

        let (status, _, body) = call(&[("RemoteUrl", &url), ("Authorization", "Bearer wrong")]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, b"token required");
    }

    #[tokio::test]
    async fn test_origin_failure_becomes_bad_request() {
        let (origin, _) = spawn_origin().await;
        let url = format!("{origin}/missing.png");

        let (status, _, body) = call(&[("RemoteUrl", &url)]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Call to remote URL responded with 404 Not Found");
    }

    #[tokio::test]
    async fn test_undecodable_source() {
        let (origin, _) = spawn_origin().await;
        let url = format!("{origin}/notes.txt");

        let (status, _, body) = call(&[("RemoteUrl", &url)]).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(String::from_utf8_lossy(&body).starts_with("failed to decode source image"));
    }

    #[tokio::test]
    async fn test_fetch_failures() {
        let (status, _, _) = call(&[("RemoteUrl", "not a url")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed = format!("http://{}/photo.png", listener.local_addr().unwrap());
        drop(listener);

        let (status, _, body) = call(&[("RemoteUrl", &closed)]).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(String::from_utf8_lossy(&body).starts_with("Failed to fetch remote URL"));
    }

    #[tokio::test]
    async fn test_origin_timeout() {
        let (origin, _) = spawn_origin().await;
        let url = format!("{origin}/slow.png");
        let config = ProxyConfig {
            fetch_timeout: Duration::from_millis(200),
            ..test_config()
        };

        let (status, _, body) = call_with(config, &[("RemoteUrl", &url)]).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(String::from_utf8_lossy(&body).starts_with("Failed to fetch remote URL"));
    }

    #[tokio::test]
    async fn test_unreadable_remote_url_is_rejected() {
        let request = Request::builder()
            .uri("/")
            .header("RemoteUrl", HeaderValue::from_bytes(b"http://example.com/\xe9t\xe9.png").unwrap())
            .body(Body::empty())
            .unwrap();

        let (status, _, body) = send(test_config(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"RemoteUrl header is not a valid URL string");
    }

    #[tokio::test]
    async fn test_oversized_origin_body() {
        let (origin, hits) = spawn_origin().await;
        let url = format!("{origin}/photo.png");
        let config = ProxyConfig {
            max_source_bytes: 1024,
            ..test_config()
        };

        let (status, _, body) = call_with(config, &[("RemoteUrl", &url)]).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, b"Remote image is larger than 1024 bytes");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
