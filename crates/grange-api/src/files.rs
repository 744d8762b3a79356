use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use reqwest::header::CONTENT_TYPE;

use crate::client::{ApiClient, ApiError};

/// Binary file content fetched from the authenticated file endpoint.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileContent {
    /// Render as a `data:` URI for inline display of image payloads.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, B64.encode(&self.bytes))
    }
}

impl ApiClient {
    /// GET /files/{file_id}: the raw bytes plus the served content type.
    pub async fn fetch_file(&self, file_id: &str) -> Result<FileContent, ApiError> {
        let url = self.url(&format!("files/{}", file_id))?;
        let res = self.http().get(url).send().await?.error_for_status()?;

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = res.bytes().await?.to_vec();
        Ok(FileContent { content_type, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_encodes_content() {
        let file = FileContent {
            content_type: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };
        assert_eq!(file.data_uri(), "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn data_uri_on_empty_file() {
        let file = FileContent { content_type: "image/jpeg".to_string(), bytes: vec![] };
        assert_eq!(file.data_uri(), "data:image/jpeg;base64,");
    }
}
