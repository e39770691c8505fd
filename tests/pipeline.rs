//! End-to-end request handling against a temporary serving root

#![cfg(unix)]

use async_trait::async_trait;
use devhost::config::{AppState, LoggingConfig, ServeOptions};
use devhost::handler::handle_request;
use devhost::rewrite::{RewriteArgs, RewriteOutput, Rewriter};
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderValue, ACCEPT_RANGES, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CACHE_CONTROL, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, EXPIRES, LOCATION, RANGE, X_CONTENT_TYPE_OPTIONS,
};
use hyper::{Method, Request, StatusCode};
use std::os::unix::fs::symlink;
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    root: std::path::PathBuf,
    hundred: Vec<u8>,
    thousand: Vec<u8>,
    large: Vec<u8>,
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + u8::try_from(i % 26).unwrap()).collect()
}

/// root/
///   a -> ../outside          (escapes)
///   abs -> <tmp>/outside/secret.txt
///   link.txt -> hundred.txt
///   hundred.txt, thousand.bin, large.bin
///   docs/{zeta/, beta/, alpha.txt, .hidden}
///   site/index.html
/// outside/secret.txt
fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    let outside = tmp.path().join("outside");
    std::fs::create_dir_all(root.join("docs/zeta")).unwrap();
    std::fs::create_dir_all(root.join("docs/beta")).unwrap();
    std::fs::create_dir_all(root.join("site")).unwrap();
    std::fs::create_dir_all(&outside).unwrap();

    std::fs::write(outside.join("secret.txt"), "top secret").unwrap();
    std::fs::write(root.join("docs/alpha.txt"), "alpha").unwrap();
    std::fs::write(root.join("docs/.hidden"), "hidden").unwrap();
    std::fs::write(root.join("site/index.html"), "<h1>site</h1>").unwrap();

    let hundred = pattern(100);
    let thousand = pattern(1000);
    let large = pattern(200 * 1024);
    std::fs::write(root.join("hundred.txt"), &hundred).unwrap();
    std::fs::write(root.join("thousand.bin"), &thousand).unwrap();
    std::fs::write(root.join("large.bin"), &large).unwrap();

    symlink("../outside", root.join("a")).unwrap();
    symlink(outside.join("secret.txt"), root.join("abs")).unwrap();
    symlink("hundred.txt", root.join("link.txt")).unwrap();

    Fixture {
        _tmp: tmp,
        root,
        hundred,
        thousand,
        large,
    }
}

fn state_for(options: ServeOptions) -> Arc<AppState> {
    let logging = LoggingConfig {
        access_log: false,
        ..LoggingConfig::default()
    };
    Arc::new(AppState::new(options, &logging))
}

fn state(root: &Path) -> Arc<AppState> {
    state_for(ServeOptions::new(root).unwrap())
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

async fn send(state: &Arc<AppState>, req: Request<()>) -> Reply {
    let peer = "127.0.0.1:40000".parse().unwrap();
    let resp = handle_request(req, Arc::clone(state), peer).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body,
    }
}

async fn get(state: &Arc<AppState>, uri: &str) -> Reply {
    send(state, Request::get(uri).body(()).unwrap()).await
}

async fn get_range(state: &Arc<AppState>, uri: &str, range: &str) -> Reply {
    let req = Request::get(uri).header(RANGE, range).body(()).unwrap();
    send(state, req).await
}

#[tokio::test]
async fn relative_symlink_escape_is_forbidden() {
    let fx = fixture();
    let state = state(&fx.root);

    let reply = get(&state, "/a/secret.txt").await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert!(reply.body.is_empty());

    let reply = get(&state, "/a/").await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn absolute_symlink_escape_is_forbidden() {
    let fx = fixture();
    let reply = get(&state(&fx.root), "/abs").await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn serve_symlink_targets_follows_links_out_of_root() {
    let fx = fixture();
    let options = ServeOptions::new(&fx.root)
        .unwrap()
        .with_serve_symlink_targets(true);
    let reply = get(&state_for(options), "/a/secret.txt").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "top secret");
}

#[tokio::test]
async fn directory_without_slash_redirects() {
    let fx = fixture();
    let reply = get(&state(&fx.root), "/docs").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.headers[LOCATION], "docs/");
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn directory_listing_orders_entries() {
    let fx = fixture();
    let reply = get(&state(&fx.root), "/docs/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[CONTENT_TYPE], "text/html; charset=utf-8");

    let html = String::from_utf8(reply.body.to_vec()).unwrap();
    let pos = |href: &str| {
        html.find(&format!("href=\"{href}\""))
            .unwrap_or_else(|| panic!("missing {href} in {html}"))
    };
    assert!(pos("..") < pos("beta/"));
    assert!(pos("beta/") < pos("zeta/"));
    assert!(pos("zeta/") < pos("alpha.txt"));
    assert!(!html.contains(".hidden"));
}

#[tokio::test]
async fn root_listing_has_no_parent_entry() {
    let fx = fixture();
    let reply = get(&state(&fx.root), "/").await;
    assert_eq!(reply.status, StatusCode::OK);
    let html = String::from_utf8(reply.body.to_vec()).unwrap();
    assert!(!html.contains("href=\"..\""));
    assert!(html.contains("href=\"docs/\""));
}

#[tokio::test]
async fn listing_disabled_is_not_found() {
    let fx = fixture();
    let options = ServeOptions::new(&fx.root).unwrap().with_listing(false);
    let reply = get(&state_for(options), "/docs/").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn index_html_is_substituted() {
    let fx = fixture();
    let reply = get(&state(&fx.root), "/site/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "<h1>site</h1>");
    assert_eq!(reply.headers[CONTENT_TYPE], "text/html; charset=utf-8");
}

#[tokio::test]
async fn symlinked_index_is_listed_not_served() {
    let fx = fixture();
    std::fs::create_dir(fx.root.join("linked")).unwrap();
    symlink("../site/index.html", fx.root.join("linked/index.html")).unwrap();

    let reply = get(&state(&fx.root), "/linked/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[CONTENT_TYPE], "text/html; charset=utf-8");
    let html = String::from_utf8(reply.body.to_vec()).unwrap();
    assert!(html.contains("href=\"index.html\""));
    assert!(!html.contains("<h1>site</h1>"));
}

#[tokio::test]
async fn non_regular_files_are_not_found() {
    let fx = fixture();
    let _socket = UnixListener::bind(fx.root.join("app.sock")).unwrap();

    let state = state(&fx.root);
    assert_eq!(get(&state, "/app.sock").await.status, StatusCode::NOT_FOUND);
    let req = Request::head("/app.sock").body(()).unwrap();
    assert_eq!(send(&state, req).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn encoded_slash_stays_inside_the_segment() {
    let fx = fixture();
    std::fs::write(fx.root.join("a%2Fb.txt"), "literal").unwrap();
    let state = state(&fx.root);

    let reply = get(&state, "/a%2Fb.txt").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "literal");

    // Not a path into docs/
    let reply = get(&state, "/docs%2Falpha.txt").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn single_range_is_partial_content() {
    let fx = fixture();
    let reply = get_range(&state(&fx.root), "/hundred.txt", "bytes=0-9").await;
    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.headers[CONTENT_RANGE], "bytes 0-9/100");
    assert_eq!(reply.headers[CONTENT_LENGTH], "10");
    assert_eq!(reply.body, &fx.hundred[..10]);
}

#[tokio::test]
async fn suffix_range_covers_the_tail() {
    let fx = fixture();
    let reply = get_range(&state(&fx.root), "/thousand.bin", "bytes=-500").await;
    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.headers[CONTENT_RANGE], "bytes 500-999/1000");
    assert_eq!(reply.body, &fx.thousand[500..]);
}

#[tokio::test]
async fn streamed_range_is_byte_exact() {
    let fx = fixture();
    let reply = get_range(&state(&fx.root), "/large.bin", "bytes=70000-150000").await;
    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.headers[CONTENT_LENGTH], "80001");
    assert_eq!(reply.body, &fx.large[70_000..=150_000]);
}

#[tokio::test]
async fn multi_range_is_unsatisfiable() {
    let fx = fixture();
    let reply = get_range(&state(&fx.root), "/hundred.txt", "bytes=0-1,5-6").await;
    assert_eq!(reply.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(reply.headers[CONTENT_RANGE], "bytes */100");
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn unreadable_range_header_is_unsatisfiable() {
    let fx = fixture();
    let req = Request::get("/hundred.txt")
        .header(RANGE, HeaderValue::from_bytes(b"bytes=0-\xff9").unwrap())
        .body(())
        .unwrap();
    let reply = send(&state(&fx.root), req).await;
    assert_eq!(reply.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(reply.headers[CONTENT_RANGE], "bytes */100");
}

#[tokio::test]
async fn head_range_has_partial_headers_and_no_body() {
    let fx = fixture();
    let req = Request::head("/hundred.txt")
        .header(RANGE, "bytes=10-19")
        .body(())
        .unwrap();
    let reply = send(&state(&fx.root), req).await;
    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.headers[CONTENT_LENGTH], "10");
    assert_eq!(reply.headers[CONTENT_RANGE], "bytes 10-19/100");
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn dot_segments_redirect_before_filesystem_access() {
    let fx = fixture();
    let state = state(&fx.root);

    let reply = get(&state, "/docs/../hundred.txt?v=2").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.headers[LOCATION], "/hundred.txt?v=2");

    // Encoded dot segments are decoded before normalization
    let reply = get(&state, "/%2e%2e/outside/secret.txt").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.headers[LOCATION], "/outside/secret.txt");
}

#[tokio::test]
async fn hidden_paths_are_not_found() {
    let fx = fixture();
    let state = state(&fx.root);
    assert_eq!(get(&state, "/docs/.hidden").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&state, "/.git/config").await.status, StatusCode::NOT_FOUND);

    let options = ServeOptions::new(&fx.root).unwrap().with_serve_hidden(true);
    let reply = get(&state_for(options), "/docs/.hidden").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "hidden");
}

#[tokio::test]
async fn symlink_within_root_redirects_to_real_path() {
    let fx = fixture();
    let reply = get(&state(&fx.root), "/link.txt").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.headers[LOCATION], "hundred.txt");
}

#[tokio::test]
async fn malformed_path_is_bad_request() {
    let fx = fixture();
    let reply = get(&state(&fx.root), "/%ff").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let fx = fixture();
    let reply = get(&state(&fx.root), "/nope.txt").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.headers[CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn head_returns_headers_only() {
    let fx = fixture();
    let req = Request::head("/hundred.txt").body(()).unwrap();
    let reply = send(&state(&fx.root), req).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[CONTENT_LENGTH], "100");
    assert_eq!(reply.headers[ACCEPT_RANGES], "bytes");
    assert_eq!(reply.headers[CONTENT_TYPE], "text/plain; charset=utf-8");
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn canonical_requests_are_idempotent() {
    let fx = fixture();
    let state = state(&fx.root);
    let first = get(&state, "/hundred.txt").await;
    let second = get(&state, "/hundred.txt").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.status, second.status);
    assert_eq!(first.body, second.body);
    assert_eq!(first.body, fx.hundred);
}

#[tokio::test]
async fn default_headers_on_every_response() {
    let fx = fixture();
    let options = ServeOptions::new(&fx.root).unwrap().with_cors(true);
    let cors_state = state_for(options);

    for uri in ["/hundred.txt", "/docs", "/a/secret.txt", "/nope"] {
        let reply = get(&cors_state, uri).await;
        assert_eq!(reply.headers[EXPIRES], "0", "{uri}");
        assert_eq!(reply.headers[CACHE_CONTROL], "no-store", "{uri}");
        assert_eq!(reply.headers[X_CONTENT_TYPE_OPTIONS], "nosniff", "{uri}");
        assert_eq!(reply.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*", "{uri}");
    }

    let reply = get(&state(&fx.root), "/hundred.txt").await;
    assert!(!reply.headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn unsupported_methods() {
    let fx = fixture();
    let state = state(&fx.root);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/hundred.txt")
        .body(())
        .unwrap();
    let reply = send(&state, req).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.headers[ALLOW], "GET, HEAD, OPTIONS");
    assert_eq!(reply.headers[CACHE_CONTROL], "no-store");

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .body(())
        .unwrap();
    assert_eq!(send(&state, req).await.status, StatusCode::NO_CONTENT);
}

struct QueryRewriter;

#[async_trait]
impl Rewriter for QueryRewriter {
    fn name(&self) -> &'static str {
        "query"
    }

    async fn rewrite(&self, args: &RewriteArgs<'_>) -> Option<RewriteOutput> {
        (args.search == "?lol").then(|| RewriteOutput::new("lol"))
    }
}

#[tokio::test]
async fn rewriter_output_replaces_file_content() {
    let fx = fixture();
    let options = ServeOptions::new(&fx.root)
        .unwrap()
        .with_rewriter(Arc::new(QueryRewriter));
    let state = state_for(options);

    let reply = get(&state, "/hundred.txt?lol").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "lol");
    assert_eq!(reply.headers[CONTENT_LENGTH], "3");
    assert_eq!(reply.headers[CONTENT_TYPE], "text/plain; charset=utf-8");

    let reply = get(&state, "/hundred.txt?other").await;
    assert_eq!(reply.body, fx.hundred);
}

#[tokio::test]
async fn head_on_rewritten_content_has_length_and_no_body() {
    let fx = fixture();
    let options = ServeOptions::new(&fx.root)
        .unwrap()
        .with_rewriter(Arc::new(QueryRewriter));
    let req = Request::head("/hundred.txt?lol").body(()).unwrap();
    let reply = send(&state_for(options), req).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[CONTENT_LENGTH], "3");
    assert!(reply.body.is_empty());
}

/// Claims every directory
struct DirectoryIndex;

#[async_trait]
impl Rewriter for DirectoryIndex {
    fn name(&self) -> &'static str {
        "directory-index"
    }

    async fn rewrite(&self, args: &RewriteArgs<'_>) -> Option<RewriteOutput> {
        args.is_dir().then(|| {
            RewriteOutput::new(format!("index of {}", args.request_path))
                .with_content_type("text/plain")
        })
    }
}

#[tokio::test]
async fn registered_rewriter_wins_over_listing() {
    let fx = fixture();
    let options = ServeOptions::new(&fx.root)
        .unwrap()
        .with_rewriter(Arc::new(DirectoryIndex));
    let state = state_for(options);

    let reply = get(&state, "/docs/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "index of /docs/");
    assert_eq!(reply.headers[CONTENT_TYPE], "text/plain; charset=utf-8");

    // Files are left to the plain transfer
    let reply = get(&state, "/hundred.txt").await;
    assert_eq!(reply.body, fx.hundred);
}
