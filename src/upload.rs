use log::{info, warn};
use meetcore::net::HttpClient;
use meetcore::upload::{
    DEFAULT_FOLDER, UploadCredentials, UploadedImage, build_upload_request, parse_upload_response,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image upload is not configured: {0}")]
    Configuration(&'static str),

    #[error("http error: {0}")]
    Http(#[source] anyhow::Error),

    #[error("upload failed {status} body={body}")]
    Upload { status: u16, body: String },

    #[error("invalid upload response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Uploads profile images to the hosted image service.
///
/// Failures are returned to the caller as-is; nothing is retried.
pub struct ImageUploader {
    http_client: Arc<dyn HttpClient>,
    credentials: Option<UploadCredentials>,
}

impl ImageUploader {
    pub fn new(http_client: Arc<dyn HttpClient>, credentials: Option<UploadCredentials>) -> Self {
        if credentials.is_none() {
            warn!(
                "Image upload credentials not configured. Set CLOUDINARY_CLOUD_NAME, \
                 CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET."
            );
        }
        Self {
            http_client,
            credentials,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Uploads `data` into `folder` (default [`DEFAULT_FOLDER`]).
    pub async fn upload_image(
        &self,
        data: Vec<u8>,
        folder: Option<&str>,
    ) -> Result<UploadedImage, UploadError> {
        let credentials = self.credentials.clone().ok_or(UploadError::Configuration(
            "set CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET",
        ))?;
        let folder = folder.unwrap_or(DEFAULT_FOLDER).to_string();
        let timestamp = chrono::Utc::now().timestamp();

        // Base64 of a full-size photo is not free; keep it off the runtime.
        let request = tokio::task::spawn_blocking(move || {
            build_upload_request(&credentials, &data, &folder, timestamp)
        })
        .await
        .map_err(|e| UploadError::Http(e.into()))?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(UploadError::Http)?;

        if response.status_code >= 400 {
            let body = match response.body_string() {
                Ok(body) => body,
                Err(body_err) => format!("<unreadable body: {body_err}>"),
            };
            return Err(UploadError::Upload {
                status: response.status_code,
                body,
            });
        }

        let image = parse_upload_response(&response.body)?;
        info!("Uploaded image {} -> {}", image.public_id, image.secure_url);
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockHttpClient, UnreachableHttpClient};

    fn creds() -> UploadCredentials {
        UploadCredentials {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let http = Arc::new(MockHttpClient::ok(b"{}".to_vec()));
        let uploader = ImageUploader::new(http.clone(), None);
        assert!(!uploader.is_configured());

        let err = uploader.upload_image(vec![1, 2, 3], None).await.unwrap_err();
        assert!(matches!(err, UploadError::Configuration(_)));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn successful_upload_returns_hosted_url() {
        let http = Arc::new(MockHttpClient::ok(
            br#"{"secure_url":"https://res/p.jpg","public_id":"echomeet/profile-pics/p"}"#
                .to_vec(),
        ));
        let uploader = ImageUploader::new(http.clone(), Some(creds()));

        let image = uploader
            .upload_image(vec![0xFF, 0xD8, 0xFF, 0xE0], None)
            .await
            .unwrap();
        assert_eq!(image.secure_url, "https://res/p.jpg");

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[tokio::test]
    async fn error_status_surfaces_body() {
        let http = Arc::new(MockHttpClient::with_status(401, b"bad signature".to_vec()));
        let uploader = ImageUploader::new(http, Some(creds()));

        let err = uploader
            .upload_image(vec![1], Some("avatars"))
            .await
            .unwrap_err();
        match err {
            UploadError::Upload { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad signature");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_is_an_http_error() {
        let uploader = ImageUploader::new(Arc::new(UnreachableHttpClient), Some(creds()));

        let err = uploader.upload_image(vec![1, 2, 3], None).await.unwrap_err();
        match err {
            UploadError::Http(source) => {
                assert!(source.to_string().contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
