//! `porter upload`: push a signed package to the archive server.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use reqwest::multipart::{Form, Part};

use porter_core::config::Config;

pub async fn run(package: &Path, archive: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let base = match archive {
        Some(addr) => addr.to_string(),
        None => config.upload_addr.clone(),
    };

    if !package.is_file() {
        bail!("package file {} does not exist", package.display());
    }
    let asc_path = PathBuf::from(format!("{}.asc", package.display()));
    if !asc_path.is_file() {
        bail!(
            "signature file {} does not exist; run `porter sign` first",
            asc_path.display()
        );
    }

    let pkg_name = file_name(package)?;
    let asc_name = file_name(&asc_path)?;
    let pkg_bytes = fs::read(package).context("failed to read package")?;
    let asc_bytes = fs::read(&asc_path).context("failed to read signature")?;

    let form = Form::new()
        .part("package", Part::bytes(pkg_bytes).file_name(pkg_name))
        .part("packageAsc", Part::bytes(asc_bytes).file_name(asc_name));

    tracing::info!(package = %package.display(), archive = %base, "uploading package");
    let response = reqwest::Client::new()
        .post(format!("{base}/packages"))
        .multipart(form)
        .send()
        .await
        .context("failed to reach archive server")?;

    let status = response.status();
    if !status.is_success() {
        bail!("archive server refused upload: {status}");
    }

    tracing::info!(package = %package.display(), "successfully uploaded package");
    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}
