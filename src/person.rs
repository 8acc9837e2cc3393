//! Person enrollment. Shares the upload and feedback contracts with the
//! scan loop but runs outside it: one JSON POST with base64 face photos.

use std::path::PathBuf;

use anyhow::{bail, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{info, warn};

use crate::api::types::{RegisterRequest, RegisterResponse};
use crate::api::ApiClient;
use crate::feedback::Feedback;

pub const MIN_ENROLLMENT_IMAGES: usize = 3;

/// Register a person from face photos. Needs a non-empty name and at
/// least three readable images; unreadable or empty files are skipped with
/// a warning. The outcome is spoken either way.
pub async fn register_person(
    client: &ApiClient,
    feedback: &dyn Feedback,
    name: &str,
    images: &[PathBuf],
) -> Result<RegisterResponse> {
    let name = name.trim();
    if name.is_empty() {
        bail!("a name is required");
    }
    if images.len() < MIN_ENROLLMENT_IMAGES {
        bail!(
            "need at least {} images, got {}",
            MIN_ENROLLMENT_IMAGES,
            images.len()
        );
    }

    let mut encoded = Vec::with_capacity(images.len());
    for path in images {
        match tokio::fs::read(path).await {
            Ok(bytes) if !bytes.is_empty() => encoded.push(STANDARD.encode(bytes)),
            Ok(_) => warn!("skipping empty image {}", path.display()),
            Err(err) => warn!("skipping unreadable image {}: {}", path.display(), err),
        }
    }

    if encoded.len() < MIN_ENROLLMENT_IMAGES {
        bail!(
            "only {} of {} images could be read; need at least {}",
            encoded.len(),
            images.len(),
            MIN_ENROLLMENT_IMAGES
        );
    }

    info!("registering '{}' with {} images", name, encoded.len());
    let request = RegisterRequest {
        name: name.to_string(),
        images: encoded,
    };
    let response = client.register_person(&request).await?;

    if response.success {
        feedback.speak(&format!("Profile saved for {}", name), true);
    } else {
        let message = match response.error.as_deref() {
            Some("no_face_detected") => "No face detected. Try again.".to_string(),
            Some("duplicate_name") => format!("Name {} already exists.", name),
            _ => response
                .message
                .clone()
                .unwrap_or_else(|| "Registration failed".to_string()),
        };
        feedback.speak(&message, true);
    }

    Ok(response)
}
