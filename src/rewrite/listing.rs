//! Directory listing rewriter
//!
//! Renders a small HTML index for directory requests.

use super::{RewriteArgs, RewriteOutput, Rewriter};
use crate::logger;
use async_trait::async_trait;
use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::cmp::Ordering;
use std::path::Path;
use tokio::fs;

/// Characters left alone in listing hrefs
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Built-in rewriter producing HTML directory listings
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryListing {
    show_hidden: bool,
}

impl DirectoryListing {
    pub const fn new(show_hidden: bool) -> Self {
        Self { show_hidden }
    }
}

#[async_trait]
impl Rewriter for DirectoryListing {
    fn name(&self) -> &'static str {
        "listing"
    }

    async fn rewrite(&self, args: &RewriteArgs<'_>) -> Option<RewriteOutput> {
        if !args.is_dir() {
            return None;
        }

        let entries = match directory_entries(args.resolved_path, self.show_hidden).await {
            Ok(entries) => entries,
            Err(e) => {
                logger::log_warning(&format!(
                    "Failed to list directory '{}': {e}",
                    args.resolved_path.display()
                ));
                return None;
            }
        };

        let html = render_listing(args.request_path, &entries);
        Some(RewriteOutput::new(html).with_content_type("text/html"))
    }
}

/// Entry names of `dir`, directories suffixed with `/`, sorted for display
async fn directory_entries(dir: &Path, show_hidden: bool) -> std::io::Result<Vec<String>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !show_hidden && name.starts_with('.') {
            continue;
        }
        // Follow links so a link to a directory lists as one
        let is_dir = fs::metadata(entry.path())
            .await
            .is_ok_and(|meta| meta.is_dir());
        entries.push(if is_dir { format!("{name}/") } else { name });
    }

    entries.sort_by(|a, b| compare_entries(a, b));
    Ok(entries)
}

/// Directories first, then full lexicographic order
fn compare_entries(a: &str, b: &str) -> Ordering {
    let dir_a = a.ends_with('/');
    let dir_b = b.ends_with('/');
    dir_b.cmp(&dir_a).then_with(|| a.cmp(b))
}

/// Render the listing page; `..` leads unless this is the site root
pub fn render_listing(request_path: &str, entries: &[String]) -> String {
    let parent = (request_path != "/").then_some("..");

    let links: String = parent
        .into_iter()
        .chain(entries.iter().map(String::as_str))
        .map(|name| {
            let href = utf8_percent_encode(name, HREF).to_string();
            format!(
                "<li><a href=\"{}\">{}</a></li>",
                encode_double_quoted_attribute(&href),
                encode_text(name)
            )
        })
        .collect();

    let title = encode_text(request_path);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>{title}</title>
<meta name="viewport" content="width=device-width, initial-scale=1" />
<meta name="google" content="notranslate" />
<style>
body {{
  font-family: Helvetica, Arial, Sans-Serif;
  background: white;
  color: black;
  line-height: 1.25em;
}}
ul {{
  list-style: none;
  margin: 0;
  padding: 0;
}}
a {{
  display: block;
  text-decoration: none;
}}
a:hover {{
  text-decoration: underline;
}}
</style>
</head>
<body>
<h1>{title}</h1>
<ul>{links}</ul>
</body>
</html>"#
    )
}
