//! Request resolution pipeline
//!
//! Turns a request path into a response plan: redirect to the canonical URL,
//! refuse escapes, substitute `index.html`, let a rewriter answer, or fall
//! through to a (possibly partial) file transfer. Only the plan is computed
//! here; [`super::transfer`] produces the body.
//!
//! Stages, in order:
//! 1. decode and validate the path (400)
//! 2. POSIX-normalize, redirect if that changed anything (302)
//! 3. refuse hidden segments unless enabled (404)
//! 4. resolve symlinks within the root (403 on escape, 302 to the real path)
//! 5. take one metadata snapshot
//! 6. directories: substitute `index.html` or redirect to add the slash
//! 7. offer the target to the rewriters, first match wins
//! 8. range-aware file transfer, or not found

use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, LOCATION,
};
use hyper::{Method, StatusCode};
use std::ffi::OsString;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use crate::config::ServeOptions;
use crate::error::ServeError;
use crate::http::path::{
    basename, decode_request_path, encode_location, has_hidden_segment, normalize_posix,
    relative_url,
};
use crate::http::range::{parse_range_header, ByteRange, RangeParseResult};
use crate::http::{mime, DefaultHeaders};
use crate::logger;
use crate::resolve::{resolve_within_root, FileMeta, Resolution};
use crate::rewrite::{RewriteArgs, RewriterChain};

/// Directory index file name
pub const INDEX_FILE: &str = "index.html";

/// The parts of a request the pipeline looks at
#[derive(Debug, Clone, Copy)]
pub struct PipelineRequest<'a> {
    pub method: &'a Method,
    /// Raw (still percent-encoded) URI path
    pub path: &'a str,
    /// Raw query string without the `?`
    pub query: Option<&'a str>,
    /// `Range` header value
    pub range: Option<&'a str>,
}

/// Where the response body comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    Empty,
    Buffer(Bytes),
    /// Byte interval of a file, read at transfer time
    File { path: PathBuf, range: ByteRange },
}

/// Status, headers and body source of a response, before any I/O on the body
#[derive(Debug)]
pub struct ServePlan {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodySource,
}

impl ServePlan {
    fn new(status: StatusCode, body: BodySource) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    fn redirect(location: &str) -> Self {
        let mut plan = Self::new(StatusCode::FOUND, BodySource::Empty);
        plan.set_header(LOCATION, location);
        plan.set_header(CONTENT_LENGTH, "0");
        plan
    }

    fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                self.headers.insert(name, v);
            }
            Err(e) => logger::log_error(&format!("Invalid {name} header value '{value}': {e}")),
        }
    }
}

/// Static file handler: one per serving root
#[derive(Debug)]
pub struct StaticHandler {
    options: ServeOptions,
    rewriters: RewriterChain,
    defaults: DefaultHeaders,
}

impl StaticHandler {
    pub fn new(options: ServeOptions) -> Self {
        let rewriters = options.rewriter_chain();
        let defaults = DefaultHeaders::new(options.cors);
        Self {
            options,
            rewriters,
            defaults,
        }
    }

    pub const fn options(&self) -> &ServeOptions {
        &self.options
    }

    /// Headers every response from this handler carries
    pub const fn default_headers(&self) -> DefaultHeaders {
        self.defaults
    }

    /// Compute the response plan for a GET or HEAD request
    pub async fn plan(&self, req: &PipelineRequest<'_>) -> Result<ServePlan, ServeError> {
        let is_head = *req.method == Method::HEAD;

        // 1. Decode & validate
        let realname = decode_request_path(req.path)
            .ok_or_else(|| ServeError::ClientPath(req.path.to_string()))?;
        if !realname.starts_with('/') {
            return Err(ServeError::ClientPath(realname));
        }

        // 2. Normalize ("/../../foo" => "/foo") before touching the filesystem
        let normalized = normalize_posix(&realname);
        if normalized != realname {
            return Ok(ServePlan::redirect(&encode_location(&normalized, req.query)));
        }

        // 3. Hidden files cannot even be probed
        if !self.options.serve_hidden && has_hidden_segment(&realname) {
            logger::log_debug(&format!("Refusing hidden path: {realname}"));
            return Err(ServeError::NotFound);
        }

        // 4. Resolve within root
        let pathname = realname.as_str();
        let mut filename = literal_join(self.options.root(), pathname);
        if !self.options.serve_symlink_targets {
            match resolve_within_root(self.options.root(), pathname).await {
                Resolution::Escaped => {
                    logger::log_warning(&format!("Symlink escape blocked: {realname}"));
                    return Err(ServeError::Containment(realname));
                }
                Resolution::Within(real) if real != filename => {
                    let location = link_redirect(&filename, &real, pathname.ends_with('/'));
                    return Ok(ServePlan::redirect(&encode_location(&location, req.query)));
                }
                Resolution::Within(_) => {}
            }
        }

        // 5. One metadata snapshot
        let mut stat = FileMeta::stat(&filename, true).await;

        // 6. Directory index or canonical trailing slash
        if stat.is_some_and(|s| s.is_dir()) {
            let candidate = filename.join(INDEX_FILE);
            let index_stat =
                FileMeta::stat(&candidate, self.options.serve_symlink_targets).await;

            if index_stat.is_some_and(|s| !s.is_dir() && !s.is_symlink()) {
                filename = candidate;
                stat = index_stat;
            } else if !pathname.ends_with('/') {
                let location = format!("{}/", basename(pathname));
                return Ok(ServePlan::redirect(&encode_location(&location, req.query)));
            }
        }

        // 7. Rewriters
        let search = req.query.map(|q| format!("?{q}")).unwrap_or_default();
        let args = RewriteArgs {
            meta: stat,
            resolved_path: &filename,
            request_path: &realname,
            search: &search,
        };
        if let Some((name, output)) = self.rewriters.apply(&args).await {
            logger::log_debug(&format!("Rewriter '{name}' handled {realname}"));
            let mut plan = ServePlan::new(StatusCode::OK, BodySource::Empty);
            if let Some(content_type) =
                mime::content_type_for(&filename, output.content_type.as_deref())
            {
                plan.set_header(CONTENT_TYPE, &content_type);
            }
            plan.set_header(CONTENT_LENGTH, &output.content.len().to_string());
            if !is_head {
                plan.body = BodySource::Buffer(output.content);
            }
            return Ok(plan);
        }

        // 8. Regular file; directories, FIFOs, sockets and devices are not served
        let Some(meta) = stat.filter(FileMeta::is_file) else {
            return Err(ServeError::NotFound);
        };
        self.plan_transfer(filename, meta, req.range, is_head)
    }

    fn plan_transfer(
        &self,
        filename: PathBuf,
        meta: FileMeta,
        range_header: Option<&str>,
        is_head: bool,
    ) -> Result<ServePlan, ServeError> {
        let size = meta.size;
        let (status, range) = match parse_range_header(range_header, size) {
            RangeParseResult::Valid(range) => (StatusCode::PARTIAL_CONTENT, range),
            RangeParseResult::Invalid => return Err(ServeError::RangeUnsatisfiable { size }),
            RangeParseResult::Absent => (StatusCode::OK, ByteRange { start: 0, end: size }),
        };

        let mut plan = ServePlan::new(status, BodySource::Empty);
        if status == StatusCode::PARTIAL_CONTENT {
            plan.set_header(CONTENT_RANGE, &range.content_range(size));
        }
        plan.set_header(CONTENT_LENGTH, &range.len().to_string());
        if let Some(content_type) = mime::content_type_for(&filename, None) {
            plan.set_header(CONTENT_TYPE, &content_type);
        }
        plan.set_header(ACCEPT_RANGES, "bytes");

        if !is_head {
            plan.body = BodySource::File {
                path: filename,
                range,
            };
        }
        Ok(plan)
    }
}

/// `root` joined with a URL path, keeping a trailing separator
fn literal_join(root: &Path, pathname: &str) -> PathBuf {
    let mut joined = root.to_path_buf();
    joined.extend(pathname.split('/').filter(|s| !s.is_empty()));
    if pathname.ends_with('/') {
        let mut raw: OsString = joined.into_os_string();
        raw.push(MAIN_SEPARATOR_STR);
        joined = PathBuf::from(raw);
    }
    joined
}

/// Redirect target from the literal path to its real counterpart
///
/// Relative to the directory the client is currently in, so the redirect
/// stays correct when served under a different prefix.
fn link_redirect(filename: &Path, real: &Path, has_trailing_slash: bool) -> String {
    let base = if has_trailing_slash {
        filename
    } else {
        filename.parent().unwrap_or(filename)
    };
    let mut location = relative_url(base, real);
    if has_trailing_slash {
        location.push('/');
    }
    if location.is_empty() {
        location.push_str("./");
    }
    location
}
