//! Attachment download and content gating.

use crate::error::AttachmentError;

/// Upper bound on downloaded attachment size.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// File extensions read as plain text content. Anything else gets the
/// fixed "cannot read" reply instead of an upstream call.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "csv", "tsv", "json", "jsonl", "log", "xml", "yaml", "yml", "toml",
    "ini", "html", "css", "js", "ts", "py", "rs", "java", "c", "cpp", "h", "sh", "sql",
];

/// A downloaded image with its declared media type.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// Whether a file name looks like plain-text content the bot can read.
pub fn is_text_file(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Gate a file attachment before any download happens.
pub fn ensure_readable(file_name: &str) -> Result<(), AttachmentError> {
    if is_text_file(file_name) {
        Ok(())
    } else {
        Err(AttachmentError::Unsupported(file_name.to_string()))
    }
}

async fn download(http: &reqwest::Client, url: &str) -> Result<reqwest::Response, AttachmentError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|error| AttachmentError::Download(error.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(AttachmentError::Download(format!(
            "download returned status {status}"
        )));
    }
    Ok(response)
}

fn check_size(size: usize) -> Result<(), AttachmentError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge {
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

/// Download an image, taking the media type from the Content-Type header.
pub async fn download_image(
    http: &reqwest::Client,
    url: &str,
) -> Result<DownloadedImage, AttachmentError> {
    let response = download(http, url).await?;
    let media_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .unwrap_or_else(|| "image/jpeg".into());

    let bytes = response
        .bytes()
        .await
        .map_err(|error| AttachmentError::Download(error.to_string()))?;
    check_size(bytes.len())?;

    Ok(DownloadedImage {
        bytes: bytes.to_vec(),
        media_type,
    })
}

/// Download a text attachment as UTF-8 content, replacing invalid bytes.
pub async fn download_text(http: &reqwest::Client, url: &str) -> Result<String, AttachmentError> {
    let response = download(http, url).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|error| AttachmentError::Download(error.to_string()))?;
    check_size(bytes.len())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_extensions_are_recognized_case_insensitively() {
        assert!(is_text_file("notes.txt"));
        assert!(is_text_file("báo cáo.MD"));
        assert!(is_text_file("data.JSON"));
        assert!(is_text_file("script.py"));
    }

    #[test]
    fn test_binary_and_extensionless_files_are_rejected() {
        assert!(!is_text_file("photo.jpg"));
        assert!(!is_text_file("slides.pptx"));
        assert!(!is_text_file("archive.zip"));
        assert!(!is_text_file("Makefile"));
    }

    #[test]
    fn test_ensure_readable_names_the_offending_file() {
        assert!(ensure_readable("notes.txt").is_ok());
        let error = ensure_readable("photo.jpg").unwrap_err();
        assert!(matches!(error, AttachmentError::Unsupported(name) if name == "photo.jpg"));
    }

    #[test]
    fn test_size_guard() {
        assert!(check_size(MAX_ATTACHMENT_BYTES).is_ok());
        assert!(matches!(
            check_size(MAX_ATTACHMENT_BYTES + 1),
            Err(AttachmentError::TooLarge { .. })
        ));
    }
}
