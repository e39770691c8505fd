//! File transfer
//!
//! Turns a [`ServePlan`] into a hyper response. Files at or below
//! [`READ_FULLY_THRESHOLD`] bytes are read into memory in one go; larger ones
//! are streamed so memory use stays bounded.

use futures_util::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::Response;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::pipeline::{BodySource, ServePlan};
use crate::error::ServeError;
use crate::http::range::ByteRange;
use crate::http::response::{empty, full, ResponseBody};

/// At this size or below a file is read fully before writing
pub const READ_FULLY_THRESHOLD: u64 = 64 * 1024;

/// Chunk size used when streaming larger files
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Build the response for a plan, opening the file if there is one
///
/// Fails with [`ServeError::Transfer`] only before any header is sent; an
/// error in the middle of a stream terminates the connection instead.
pub async fn into_response(plan: ServePlan) -> Result<Response<ResponseBody>, ServeError> {
    let ServePlan {
        status,
        headers,
        body,
    } = plan;

    let body = match body {
        BodySource::Empty => empty(),
        BodySource::Buffer(bytes) => full(bytes),
        BodySource::File { path, range } => file_body(&path, range).await?,
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

async fn file_body(path: &Path, range: ByteRange) -> io::Result<ResponseBody> {
    let mut file = File::open(path).await?;
    let size = file.metadata().await?.len();

    // The file may have shrunk since the metadata snapshot
    if range.end > size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{} shrank to {size} bytes", path.display()),
        ));
    }

    if size <= READ_FULLY_THRESHOLD {
        let data = read_fully(&mut file, size).await?;
        return Ok(full(slice(data, range)));
    }

    file.seek(SeekFrom::Start(range.start)).await?;
    let reader = file.take(range.len());
    let stream = ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE).map_ok(Frame::data);
    Ok(StreamBody::new(stream).boxed_unsync())
}

async fn read_fully(file: &mut File, size: u64) -> io::Result<Bytes> {
    let mut data = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
    file.read_to_end(&mut data).await?;
    Ok(Bytes::from(data))
}

fn slice(data: Bytes, range: ByteRange) -> Bytes {
    let start = usize::try_from(range.start).unwrap_or(usize::MAX);
    let end = usize::try_from(range.end).unwrap_or(usize::MAX);
    if start == 0 && end >= data.len() {
        data
    } else {
        data.slice(start.min(data.len())..end.min(data.len()))
    }
}
