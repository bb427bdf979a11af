use std::{
    fs::File,
    io::{
        BufWriter,
        Write,
    },
    path::Path,
    time::Duration,
};

use reqwest::{
    blocking::{
        Client,
        Response,
    },
    header::{
        ACCEPT_ENCODING,
        USER_AGENT,
    },
};

use crate::core::AnkimorphError;

const AGENT: &str = "ankimorph/0.3 (+reqwest)";

pub fn blocking_client() -> Result<Client, AnkimorphError> {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| AnkimorphError::Custom(format!("HTTP client build failed: {e}")))
}

pub fn async_client(timeout: Duration) -> Result<reqwest::Client, AnkimorphError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AnkimorphError::Custom(format!("HTTP client build failed: {e}")))
}

pub fn download_to_file(client: &Client, url: &str, path: &Path) -> Result<(), AnkimorphError> {
    let mut attempts: usize = 0;
    loop {
        attempts += 1;

        let resp = client
            .get(url)
            .header(USER_AGENT, AGENT)
            .header(ACCEPT_ENCODING, "identity")
            .send();

        let mut resp = match resp {
            Ok(r) => r,
            Err(e) => {
                if attempts < 3 {
                    std::thread::sleep(Duration::from_secs(2 * attempts as u64));
                    continue;
                }
                return Err(AnkimorphError::Custom(format!("Failed HTTP GET {}: {}", url, e)));
            }
        };

        ensure_success(&resp)?;

        let mut writer = BufWriter::new(File::create(path).map_err(|e| {
            AnkimorphError::Custom(format!("Create download file {:?} failed: {}", path, e))
        })?);

        let res = resp.copy_to(&mut writer);
        match res {
            Ok(n) if n > 0 => {
                writer.flush().ok();
                return Ok(());
            }
            Ok(_) | Err(_) => {
                if attempts < 3 {
                    std::thread::sleep(Duration::from_secs(2 * attempts as u64));
                    continue;
                }
                return Err(AnkimorphError::Custom(
                    "Failed to copy response body to file".to_string(),
                ));
            }
        }
    }
}

/// Whole response body of a GET, on the calling thread.
pub fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>, AnkimorphError> {
    let resp = client
        .get(url)
        .header(USER_AGENT, AGENT)
        .send()
        .map_err(|e| AnkimorphError::MediaDecode(format!("Failed HTTP GET {}: {}", url, e)))?;
    ensure_success(&resp)?;
    let bytes = resp
        .bytes()
        .map_err(|e| AnkimorphError::MediaDecode(format!("Failed to read {}: {}", url, e)))?;
    Ok(bytes.to_vec())
}

pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, AnkimorphError> {
    let resp = client
        .get(url)
        .header(USER_AGENT, AGENT)
        .send()
        .await
        .map_err(|e| AnkimorphError::MediaDecode(format!("Failed HTTP GET {}: {}", url, e)))?;

    if !resp.status().is_success() {
        return Err(AnkimorphError::MediaDecode(format!(
            "HTTP error {} from {}",
            resp.status(),
            resp.url()
        )));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| AnkimorphError::MediaDecode(format!("Failed to read {}: {}", url, e)))?;
    Ok(bytes.to_vec())
}

fn ensure_success(resp: &Response) -> Result<(), AnkimorphError> {
    if !resp.status().is_success() {
        return Err(AnkimorphError::Custom(format!(
            "HTTP error {} from {}",
            resp.status(),
            resp.url()
        )));
    }
    Ok(())
}
