use std::io::ErrorKind;
use std::path::Path;

use futures::StreamExt;
use log::{debug, warn};
use mdl_sources::source::DownloadHeaders;
use reqwest::Client;
use tokio::fs::{remove_file, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{truncate_url, FetchError};

/// Streams the resource at `url` into `destination`, returning the number of bytes written.
///
/// On any failure the partially written `destination` is removed before the error is
/// returned, so a page file either holds a complete response body or doesn't exist.
pub async fn fetch_image(
    client: &Client,
    url: &str,
    destination: &Path,
    headers: &DownloadHeaders,
) -> Result<u64, FetchError> {
    match stream_to_file(client, url, destination, headers).await {
        Ok(written) => Ok(written),
        Err(error) => {
            if let Err(rm_error) = remove_file(destination).await {
                if rm_error.kind() != ErrorKind::NotFound {
                    warn!(
                        "Failed to remove partial file {}: {}",
                        destination.display(),
                        rm_error
                    );
                }
            }
            Err(error)
        }
    }
}

async fn stream_to_file(
    client: &Client,
    url: &str,
    destination: &Path,
    headers: &DownloadHeaders,
) -> Result<u64, FetchError> {
    debug!("Fetching {} into {}", url, destination.display());

    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let res = request
        .send()
        .await
        .map_err(|e| FetchError::connection(url, e))?;

    if !res.status().is_success() {
        debug!(
            "Image source for {} returned status {}.",
            url,
            res.status().as_str()
        );
        return Err(FetchError::RemoteStatus {
            url: truncate_url(url),
            status: res.status(),
        });
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(destination)
        .await
        .map_err(|e| FetchError::file_io(url, e))?;

    let mut bw = BufWriter::new(file);
    let mut stream = res.bytes_stream();
    let mut written = 0;

    while let Some(item) = stream.next().await {
        let mut chunk = item.map_err(|e| FetchError::ChunkDownloadFail {
            url: truncate_url(url),
            message: e.to_string(),
        })?;
        written += chunk.len() as u64;

        bw.write_all_buf(&mut chunk)
            .await
            .map_err(|e| FetchError::file_io(url, e))?;
    }

    bw.flush().await.map_err(|e| FetchError::file_io(url, e))?;

    debug!("Finished downloading {} ({} bytes).", destination.display(), written);
    Ok(written)
}
