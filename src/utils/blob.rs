use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HttpError;

/// Size cap for featured images arriving through the upload path.
pub const MAX_FEATURED_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Size cap for profile pictures.
pub const MAX_PROFILE_PICTURE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Canonical stored shape of an embedded media payload.
///
/// `data` stays `None` when the client supplied only an external object URL;
/// the URL is kept verbatim and its target is never fetched or validated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaBlob {
    pub data: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub original_name: Option<String>,
    pub size: Option<i64>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

/// Heterogeneous inbound image representations, normalized by [`decode`].
///
/// Clients send media as an embedded base64 object, an object-URL reference,
/// or a bare base64 string; multipart file parts go through [`decode_file`].
/// Untagged: the first variant whose shape matches wins.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum MediaInput {
    Embedded {
        data: String,
        #[serde(rename = "contentType")]
        content_type: Option<String>,
        #[serde(rename = "originalName")]
        original_name: Option<String>,
        #[serde(rename = "uploadedAt")]
        uploaded_at: Option<DateTime<Utc>>,
    },
    ObjectUrl {
        #[serde(rename = "objectURL")]
        object_url: String,
    },
    Raw(String),
}

/// Transport projection of a [`MediaBlob`]: base64 payload plus a synthesized
/// retrieval URL so clients can fetch the raw bytes instead of inlining them.
#[derive(Debug, Serialize, Clone)]
pub struct MediaBlobDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "originalName", skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(rename = "uploadedAt", skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    /// Retrieval path or preserved external URL; empty for payloads that are
    /// not stored anywhere yet (the upload endpoint).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

fn validate_size(size: usize, max_size: usize) -> Result<(), HttpError> {
    if size > max_size {
        return Err(HttpError::bad_request(format!(
            "File size exceeds maximum limit of {}MB",
            max_size / (1024 * 1024)
        )));
    }
    Ok(())
}

fn validate_content_type(content_type: &str) -> Result<(), HttpError> {
    if !ALLOWED_IMAGE_TYPES.contains(&content_type) {
        return Err(HttpError::bad_request(format!(
            "File type {} is not allowed",
            content_type
        )));
    }
    Ok(())
}

/// Normalize a JSON media input into the stored blob shape.
///
/// Byte-bearing variants are size-capped and, when a MIME type is declared,
/// checked against the image allow-list. Object-URL inputs are stored as-is
/// with no payload.
pub fn decode(input: MediaInput, max_size: usize) -> Result<MediaBlob, HttpError> {
    match input {
        MediaInput::Embedded {
            data,
            content_type,
            original_name,
            uploaded_at,
        } => {
            let bytes = BASE64
                .decode(data.as_bytes())
                .map_err(|_| HttpError::bad_request("Invalid base64 image data"))?;
            validate_size(bytes.len(), max_size)?;
            if let Some(ref content_type) = content_type {
                validate_content_type(content_type)?;
            }
            Ok(MediaBlob {
                size: Some(bytes.len() as i64),
                data: Some(bytes),
                content_type,
                original_name,
                uploaded_at: Some(uploaded_at.unwrap_or_else(Utc::now)),
                url: None,
            })
        }
        MediaInput::ObjectUrl { object_url } => Ok(MediaBlob {
            data: None,
            content_type: None,
            original_name: None,
            size: None,
            uploaded_at: None,
            url: Some(object_url),
        }),
        MediaInput::Raw(data) => {
            let bytes = BASE64
                .decode(data.as_bytes())
                .map_err(|_| HttpError::bad_request("Invalid base64 image data"))?;
            validate_size(bytes.len(), max_size)?;
            Ok(MediaBlob {
                size: Some(bytes.len() as i64),
                data: Some(bytes),
                content_type: None,
                original_name: None,
                uploaded_at: Some(Utc::now()),
                url: None,
            })
        }
    }
}

/// Normalize a multipart file part. Unlike the JSON variants, the upload path
/// always knows the declared MIME type, so the allow-list check is mandatory.
pub fn decode_file(
    bytes: Vec<u8>,
    content_type: &str,
    original_name: &str,
    max_size: usize,
) -> Result<MediaBlob, HttpError> {
    validate_size(bytes.len(), max_size)?;
    validate_content_type(content_type)?;

    Ok(MediaBlob {
        size: Some(bytes.len() as i64),
        data: Some(bytes),
        content_type: Some(content_type.to_string()),
        original_name: Some(original_name.to_string()),
        uploaded_at: Some(Utc::now()),
        url: None,
    })
}

/// Project the stored blob back out for JSON transport. `url` is the
/// retrieval path for the owning entity's binary endpoint, or the preserved
/// external URL for reference-only blobs.
pub fn encode(blob: &MediaBlob, retrieval_url: &str) -> MediaBlobDto {
    MediaBlobDto {
        data: blob.data.as_ref().map(|bytes| BASE64.encode(bytes)),
        content_type: blob.content_type.clone(),
        original_name: blob.original_name.clone(),
        size: blob.size,
        uploaded_at: blob.uploaded_at,
        url: blob
            .url
            .clone()
            .unwrap_or_else(|| retrieval_url.to_string()),
    }
}

/// Serve the raw bytes of a stored blob with inline disposition headers.
/// Reference-only blobs (no payload) yield 404.
pub fn serve(blob: &MediaBlob) -> Result<Response, HttpError> {
    let bytes = blob
        .data
        .clone()
        .ok_or_else(|| HttpError::not_found("No image data stored"))?;

    let content_type = blob
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let file_name = blob
        .original_name
        .clone()
        .unwrap_or_else(|| "image".to_string());

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", file_name),
        )
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(axum::body::Body::from(bytes))
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(response.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_round_trip_preserves_bytes_and_size() {
        let original: Vec<u8> = (0u8..=255).cycle().take(1024).collect();
        let blob = decode_file(
            original.clone(),
            "image/png",
            "photo.png",
            MAX_FEATURED_IMAGE_BYTES,
        )
        .unwrap();
        assert_eq!(blob.size, Some(original.len() as i64));

        let dto = encode(&blob, "/api/articles/abc/featured-image");
        let decoded = BASE64.decode(dto.data.unwrap().as_bytes()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(dto.size, Some(original.len() as i64));
        assert_eq!(dto.url, "/api/articles/abc/featured-image");
    }

    #[test]
    fn oversized_file_is_rejected() {
        let bytes = vec![0u8; MAX_PROFILE_PICTURE_BYTES + 1];
        let err = decode_file(bytes, "image/jpeg", "big.jpg", MAX_PROFILE_PICTURE_BYTES)
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert!(err.message.contains("5MB"));
    }

    #[test]
    fn disallowed_mime_type_is_rejected() {
        let err = decode_file(vec![1, 2, 3], "application/pdf", "doc.pdf", 1024).unwrap_err();
        assert!(err.message.contains("application/pdf"));
    }

    #[test]
    fn object_url_is_preserved_verbatim_without_payload() {
        let blob = decode(
            MediaInput::ObjectUrl {
                object_url: "https://cdn.example.com/img.png".to_string(),
            },
            MAX_FEATURED_IMAGE_BYTES,
        )
        .unwrap();
        assert!(blob.data.is_none());
        assert_eq!(blob.url.as_deref(), Some("https://cdn.example.com/img.png"));

        let dto = encode(&blob, "/api/news/x/featured-image");
        assert!(dto.data.is_none());
        assert_eq!(dto.url, "https://cdn.example.com/img.png");
    }

    #[test]
    fn bare_base64_string_decodes() {
        let encoded = BASE64.encode(b"raw image bytes");
        let blob = decode(MediaInput::Raw(encoded), MAX_FEATURED_IMAGE_BYTES).unwrap();
        assert_eq!(blob.data.as_deref(), Some(b"raw image bytes".as_slice()));
        assert_eq!(blob.size, Some(15));
    }

    #[test]
    fn invalid_base64_is_a_validation_error() {
        let err = decode(
            MediaInput::Raw("not base64!!".to_string()),
            MAX_FEATURED_IMAGE_BYTES,
        )
        .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn untagged_input_shapes_deserialize() {
        let embedded: MediaInput =
            serde_json::from_str(r#"{"data":"aGk=","contentType":"image/png"}"#).unwrap();
        assert!(matches!(embedded, MediaInput::Embedded { .. }));

        let url: MediaInput =
            serde_json::from_str(r#"{"objectURL":"https://x.test/a.png"}"#).unwrap();
        assert!(matches!(url, MediaInput::ObjectUrl { .. }));

        let raw: MediaInput = serde_json::from_str(r#""aGk=""#).unwrap();
        assert!(matches!(raw, MediaInput::Raw(_)));
    }

    #[test]
    fn serve_sets_inline_disposition() {
        let blob = decode_file(vec![9, 9, 9], "image/gif", "dot.gif", 1024).unwrap();
        let response = serve(&blob).unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE.as_str()], "image/gif");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION.as_str()],
            "inline; filename=\"dot.gif\""
        );
        assert_eq!(headers[header::CONTENT_LENGTH.as_str()], "3");
    }

    #[test]
    fn serve_without_payload_is_not_found() {
        let blob = MediaBlob {
            data: None,
            content_type: None,
            original_name: None,
            size: None,
            uploaded_at: None,
            url: Some("https://cdn.example.com/img.png".to_string()),
        };
        let err = serve(&blob).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }
}
