//! Signed image-upload requests for the hosted image service.
//!
//! Profile pictures are stored with a fixed transformation: a 400x400 fill
//! crop with automatic quality and format.

use crate::net::HttpRequest;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_FOLDER: &str = "echomeet/profile-pics";
pub const PROFILE_TRANSFORMATION: &str = "c_fill,h_400,w_400/q_auto/f_auto";
pub const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Clone, PartialEq, Eq)]
pub struct UploadCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for UploadCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl UploadCredentials {
    pub fn upload_url(&self) -> String {
        format!("{API_BASE}/{}/image/upload", self.cloud_name)
    }
}

/// Hosted image returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// SHA-256 signature over the alphabetically sorted parameters, followed by
/// the API secret.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Best-effort MIME type from the leading magic bytes.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    match data {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Builds the signed upload request for `image` into `folder`.
pub fn build_upload_request(
    credentials: &UploadCredentials,
    image: &[u8],
    folder: &str,
    timestamp: i64,
) -> HttpRequest {
    let mut signed = BTreeMap::new();
    signed.insert("folder", folder.to_string());
    signed.insert("timestamp", timestamp.to_string());
    signed.insert("transformation", PROFILE_TRANSFORMATION.to_string());
    let signature = sign(&signed, &credentials.api_secret);

    let data_uri = format!(
        "data:{};base64,{}",
        sniff_mime(image),
        base64::engine::general_purpose::STANDARD.encode(image)
    );

    let mut fields: Vec<(&str, &str)> = signed.iter().map(|(k, v)| (*k, v.as_str())).collect();
    fields.push(("file", data_uri.as_str()));
    fields.push(("api_key", credentials.api_key.as_str()));
    fields.push(("signature", signature.as_str()));
    fields.push(("signature_algorithm", "sha256"));

    HttpRequest::post(credentials.upload_url()).with_form(fields)
}

pub fn parse_upload_response(body: &[u8]) -> Result<UploadedImage, serde_json::Error> {
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> UploadCredentials {
        UploadCredentials {
            cloud_name: "demo".into(),
            api_key: "1234".into(),
            api_secret: "s3cr3t".into(),
        }
    }

    #[test]
    fn signature_is_deterministic_and_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("timestamp", "1700000000".to_string());
        a.insert("folder", "f".to_string());
        let mut b = BTreeMap::new();
        b.insert("folder", "f".to_string());
        b.insert("timestamp", "1700000000".to_string());

        let sig = sign(&a, "secret");
        assert_eq!(sig, sign(&b, "secret"));
        assert_eq!(sig.len(), 64);
        assert_ne!(sig, sign(&a, "other"));
    }

    #[test]
    fn request_targets_cloud_and_carries_transformation() {
        let png = [0x89, b'P', b'N', b'G', 0, 0];
        let req = build_upload_request(&creds(), &png, DEFAULT_FOLDER, 1_700_000_000);
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "https://api.cloudinary.com/v1_1/demo/image/upload");

        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(body.contains("transformation=c_fill%2Ch_400%2Cw_400%2Fq_auto%2Ff_auto"));
        assert!(body.contains("folder=echomeet%2Fprofile-pics"));
        assert!(body.contains("file=data%3Aimage%2Fpng%3Bbase64%2C"));
        assert!(body.contains("signature_algorithm=sha256"));
        assert!(!body.contains("s3cr3t"));
    }

    #[test]
    fn credentials_debug_hides_secret() {
        assert!(!format!("{:?}", creds()).contains("s3cr3t"));
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"GIF89a"), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"hello"), "application/octet-stream");
    }

    #[test]
    fn parses_service_response() {
        let body = br#"{"secure_url":"https://res/x.jpg","public_id":"p/x","width":400,"height":400,"format":"jpg"}"#;
        let image = parse_upload_response(body).unwrap();
        assert_eq!(image.secure_url, "https://res/x.jpg");
        assert_eq!(image.width, Some(400));
        assert!(parse_upload_response(b"{}").is_err());
    }
}
