//! Wire shapes returned by the detection server.
//!
//! Every detection response carries a `success` flag; the server omits it
//! on some code paths, which normalization treats the same as `false`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hex: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<ColorData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyDetection {
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub detections: Vec<CurrencyDetection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectDetection {
    pub class_name: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub detections: Vec<ObjectDetection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Center,
    Right,
}

impl Position {
    pub fn spoken(self) -> &'static str {
        match self {
            Position::Left => "on your left",
            Position::Center => "ahead",
            Position::Right => "on your right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    VeryClose,
    Close,
    Medium,
    Far,
}

impl Distance {
    pub fn spoken(self) -> &'static str {
        match self {
            Distance::VeryClose => "very close",
            Distance::Close => "close",
            Distance::Medium => "at medium distance",
            Distance::Far => "far away",
        }
    }
}

/// One sighted person; `label` is a recognized name or the generic "person".
#[derive(Debug, Clone, Deserialize)]
pub struct PersonSighting {
    #[serde(default)]
    pub label: String,
    pub position: Option<Position>,
    pub distance: Option<Distance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub persons: Vec<PersonSighting>,
    #[serde(default)]
    pub detections: Vec<ObjectDetection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClothingColor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hex: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClothingDetection {
    pub class_name: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    pub color: Option<ClothingColor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClothingResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub tts_messages: Vec<String>,
    #[serde(default)]
    pub detections: Vec<ClothingDetection>,
}

/// A detection result tagged by the endpoint that produced it. The caller
/// knows which variant to expect because it chose the endpoint.
#[derive(Debug, Clone)]
pub enum DetectionResponse {
    Color(ColorResponse),
    Currency(CurrencyResponse),
    Object(ObjectResponse),
    Navigation(NavigationResponse),
    Clothing(ClothingResponse),
}

impl DetectionResponse {
    pub fn success(&self) -> bool {
        match self {
            DetectionResponse::Color(r) => r.success,
            DetectionResponse::Currency(r) => r.success,
            DetectionResponse::Object(r) => r.success,
            DetectionResponse::Navigation(r) => r.success,
            DetectionResponse::Clothing(r) => r.success,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub success: bool,
    pub name: Option<String>,
    pub num_embeddings: Option<u32>,
    pub error: Option<String>,
    pub message: Option<String>,
}
