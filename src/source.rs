//! Source provider: reads the dataset into a [`RawTable`], downloading it
//! first when the local copy is missing and a URL is known.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::Encoding;
use log::{error, info};

use crate::{
    columns,
    data::{RawTable, RawValue},
    io_utils,
};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub fn load_raw_table(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawTable> {
    if !path.exists() {
        bail!("CSV file not found: {path:?}");
    }
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        if decoded.len() > headers.len() {
            bail!(
                "Row {} has {} field(s) but the header declares {}",
                row_idx + 2,
                decoded.len(),
                headers.len()
            );
        }
        let mut row = decoded
            .into_iter()
            .map(|field| {
                if columns::is_missing_marker(&field) {
                    RawValue::Null
                } else {
                    RawValue::Text(field)
                }
            })
            .collect::<Vec<_>>();
        row.resize(headers.len(), RawValue::Null);
        rows.push(row);
    }

    info!(
        "Loaded '{}': {} row(s), {} column(s)",
        path.display(),
        rows.len(),
        headers.len()
    );
    Ok(RawTable::new(headers, rows))
}

/// Makes sure `path` exists, fetching it from `url` when it does not.
pub fn ensure_dataset(path: &Path, url: Option<&str>) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let Some(url) = url else {
        return Err(anyhow!(
            "CSV file not found: {path:?} (pass --dataset-url to download it)"
        ));
    };
    download_csv(url, path).with_context(|| format!("Downloading dataset from {url}"))
}

pub fn download_csv(url: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Creating directory {parent:?}"))?;
    }
    info!("Downloading {url} -> {}", path.display());
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("Building HTTP client")?;
    let response = client
        .get(url)
        .send()
        .context("Sending download request")?;
    let status = response.status();
    if !status.is_success() {
        error!("[ERROR] Download of {url} failed with HTTP {status}");
        bail!("HTTP {status} while downloading {url}");
    }
    let bytes = response.bytes().context("Reading download body")?;
    fs::write(path, &bytes).with_context(|| format!("Writing {path:?}"))?;
    info!("[OK] Downloaded {} byte(s) to {}", bytes.len(), path.display());
    Ok(())
}
