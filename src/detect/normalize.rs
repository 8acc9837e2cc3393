//! Collapses each domain's response shape into a single spoken result.
//!
//! `None` means nothing worth announcing (NoDetection). That is not an
//! error: the auto loop clears the displayed result and stays quiet, a
//! manual capture gets a gentle notice.

use crate::api::types::{
    ClothingResponse, ColorResponse, CurrencyResponse, DetectionResponse, Distance,
    NavigationResponse, ObjectDetection, Position,
};

pub const UNKNOWN_OBJECT_LABEL: &str = "Unknown object";

/// Label the server uses for an unrecognized face.
const GENERIC_PERSON_LABEL: &str = "person";

/// One deduplicatable spoken result. `key` is the lowercase-trimmed form
/// used to decide whether two announcements are "the same".
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub key: String,
    pub spoken_text: String,
    pub display_label: String,
    pub display_color_hex: Option<String>,
}

impl Announcement {
    fn new(spoken: String, color_hex: Option<String>) -> Self {
        Self {
            key: spoken.trim().to_lowercase(),
            display_label: spoken.clone(),
            spoken_text: spoken,
            display_color_hex: color_hex,
        }
    }
}

pub fn normalize(response: &DetectionResponse) -> Option<Announcement> {
    if !response.success() {
        return None;
    }

    match response {
        DetectionResponse::Color(r) => normalize_color(r),
        DetectionResponse::Currency(r) => normalize_currency(r),
        DetectionResponse::Object(r) => best_object(&r.detections),
        DetectionResponse::Navigation(r) => normalize_navigation(r),
        DetectionResponse::Clothing(r) => normalize_clothing(r),
    }
}

fn normalize_color(response: &ColorResponse) -> Option<Announcement> {
    let data = response.data.as_ref()?;
    let name = data.name.trim();
    if name.is_empty() {
        return None;
    }
    let hex = data.hex.trim();
    Some(Announcement::new(
        name.to_string(),
        (!hex.is_empty()).then(|| hex.to_string()),
    ))
}

fn normalize_currency(response: &CurrencyResponse) -> Option<Announcement> {
    let best = best_by_confidence(&response.detections, |d| d.confidence)?;
    let class = best.class.trim();
    if class.is_empty() {
        return None;
    }
    Some(Announcement::new(class.to_string(), None))
}

fn normalize_navigation(response: &NavigationResponse) -> Option<Announcement> {
    if let Some(first) = response.persons.first() {
        // A recognized name beats any number of generic sightings.
        let chosen = response
            .persons
            .iter()
            .find(|p| !is_generic_person(&p.label))
            .unwrap_or(first);

        if is_generic_person(&chosen.label) {
            let position = chosen.position.unwrap_or(Position::Center);
            let distance = chosen.distance.unwrap_or(Distance::Medium);
            let spoken = format!("Person {}, {}", position.spoken(), distance.spoken());
            return Some(Announcement::new(spoken, None));
        }

        return Some(Announcement::new(chosen.label.trim().to_string(), None));
    }

    best_object(&response.detections)
}

fn normalize_clothing(response: &ClothingResponse) -> Option<Announcement> {
    let best = best_by_confidence(&response.detections, |d| d.confidence);
    let color_hex = best
        .and_then(|d| d.color.as_ref())
        .map(|c| c.hex.trim())
        .filter(|hex| !hex.is_empty())
        .map(str::to_string);

    // The server already phrases a message on most hits; use it verbatim.
    if let Some(message) = response
        .tts_messages
        .first()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
    {
        return Some(Announcement::new(message.to_string(), color_hex));
    }

    let best = best?;
    let class = best.class_name.as_deref().map(str::trim)?;
    if class.is_empty() {
        return None;
    }

    let spoken = match best
        .color
        .as_ref()
        .map(|c| c.name.trim())
        .filter(|name| !name.is_empty())
    {
        Some(color_name) => format!("{} {}", color_name, class),
        None => class.to_string(),
    };
    Some(Announcement::new(spoken, color_hex))
}

fn best_object(detections: &[ObjectDetection]) -> Option<Announcement> {
    let best = best_by_confidence(detections, |d| d.confidence)?;
    let label = best
        .class_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_OBJECT_LABEL);
    Some(Announcement::new(label.to_string(), None))
}

/// Max-confidence pick; ties keep the first-seen entry.
fn best_by_confidence<T>(items: &[T], confidence: impl Fn(&T) -> f64) -> Option<&T> {
    items.iter().fold(None, |best, item| match best {
        Some(current) if confidence(item) > confidence(current) => Some(item),
        None => Some(item),
        best => best,
    })
}

fn is_generic_person(label: &str) -> bool {
    let label = label.trim();
    label.is_empty() || label.eq_ignore_ascii_case(GENERIC_PERSON_LABEL)
}
