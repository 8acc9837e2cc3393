use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A detection mode. The domain decides which endpoint a frame goes to,
/// which confidence threshold rides along, and how the response is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Color,
    Currency,
    Object,
    Navigation,
    Clothing,
}

impl Domain {
    pub fn endpoint(self) -> &'static str {
        match self {
            Domain::Color => "/detect-color-simple",
            Domain::Currency => "/detect-currency",
            Domain::Object => "/detect-objects",
            Domain::Navigation => "/object-navigation-detect",
            Domain::Clothing => "/detect-objects-with-color",
        }
    }

    /// Caller-supplied confidence threshold; the color endpoint takes none.
    pub fn confidence(self) -> Option<f32> {
        match self {
            Domain::Color => None,
            Domain::Currency => Some(0.5),
            Domain::Object => Some(0.3),
            Domain::Navigation => Some(0.25),
            Domain::Clothing => Some(0.25),
        }
    }

    /// Spoken when the mode is entered.
    pub fn intro(self) -> &'static str {
        match self {
            Domain::Color => "Color identification mode.",
            Domain::Currency => "Currency reader mode. Use the camera to detect currency notes.",
            Domain::Object => "Object detection mode.",
            Domain::Navigation => "Object navigation mode.",
            Domain::Clothing => "Clothing color mode.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_server_routes() {
        assert_eq!(Domain::Color.endpoint(), "/detect-color-simple");
        assert_eq!(Domain::Navigation.endpoint(), "/object-navigation-detect");
    }

    #[test]
    fn color_has_no_confidence_param() {
        assert!(Domain::Color.confidence().is_none());
        assert_eq!(Domain::Currency.confidence(), Some(0.5));
    }
}
