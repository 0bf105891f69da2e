//! Object detectors and the conversion of their output into annotations.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationKind, Argb};
use crate::error::DetectError;

/// One detected object, corners normalized to the image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
    /// Class label reported by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Confidence in `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Ready-made label text; takes precedence over the text template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Argb>,
}

/// An external detection capability.
pub trait Detector: Send + Sync {
    /// Provider name shown to the user.
    fn name(&self) -> &str;

    /// Kinds this detector can produce. All kinds by default.
    fn supports(&self, _kind: AnnotationKind) -> bool {
        true
    }

    fn detect(&self, image: &DynamicImage, kind: AnnotationKind) -> Result<Vec<Detection>, DetectError>;
}

/// How detections become annotations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectOptions {
    /// Kind of the produced annotations.
    pub kind: AnnotationKind,
    /// Color for detections that do not carry their own.
    pub color: Option<Argb>,
    /// Keep only these labels. Empty keeps everything.
    pub keep_labels: Vec<String>,
    /// Label text with `{label}` and `{score}` / `{score:.N}` placeholders.
    pub text_template: Option<String>,
}

impl DetectOptions {
    pub fn new(kind: AnnotationKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    fn keeps(&self, detection: &Detection) -> bool {
        if self.keep_labels.is_empty() {
            return true;
        }
        detection
            .label
            .as_deref()
            .is_some_and(|label| self.keep_labels.iter().any(|k| k.trim() == label))
    }
}

impl Detection {
    /// Convert to a finalized annotation of the requested kind.
    pub fn into_annotation(self, options: &DetectOptions) -> Annotation {
        let text = self.text.clone().or_else(|| {
            options
                .text_template
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| render_template(t, self.label.as_deref(), self.score))
        });
        let mut annotation = Annotation::new(options.kind, self.x, self.y, self.x2, self.y2).finalized();
        annotation.text = text.filter(|t| !t.is_empty());
        annotation.style.color = self.color.or(options.color);
        annotation
    }
}

/// Run a detector on one image and convert its output.
pub fn run_detector(
    detector: &dyn Detector,
    image: &DynamicImage,
    options: &DetectOptions,
) -> Result<Vec<Annotation>, DetectError> {
    if !detector.supports(options.kind) {
        return Err(DetectError::UnsupportedKind {
            detector: detector.name().to_string(),
            kind: options.kind.to_string(),
        });
    }
    let detections = detector.detect(image, options.kind)?;
    let total = detections.len();
    let annotations: Vec<Annotation> = detections
        .into_iter()
        .filter(|d| options.keeps(d))
        .map(|d| d.into_annotation(options))
        .collect();
    log::info!(
        "🔎 '{}' detected {} objects, kept {}",
        detector.name(),
        total,
        annotations.len()
    );
    Ok(annotations)
}

/// Substitute `{label}`, `{score}` and `{score:.N}` in a text template.
/// Unknown placeholders are left as written.
pub fn render_template(template: &str, label: Option<&str>, score: Option<f32>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let placeholder = &rest[start + 1..start + len];
        match render_placeholder(placeholder, label, score) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..=start + len]),
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

fn render_placeholder(placeholder: &str, label: Option<&str>, score: Option<f32>) -> Option<String> {
    let (name, suffix) = match placeholder.split_once(':') {
        Some((name, suffix)) => (name, Some(suffix)),
        None => (placeholder, None),
    };
    match name {
        "label" => Some(label.unwrap_or_default().to_string()),
        "score" => {
            let score = score.unwrap_or_default();
            let precision = suffix
                .and_then(|s| s.strip_prefix('.'))
                .map(|s| s.trim_end_matches('f'))
                .and_then(|s| s.parse::<usize>().ok());
            Some(match precision {
                Some(p) => format!("{:.*}", p, score),
                None => score.to_string(),
            })
        }
        _ => None,
    }
}
