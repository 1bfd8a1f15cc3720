use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::EnumString;

pub trait MimeType {
    fn mime_type(&self) -> &str;
}

/// Output encodings a crop can be served in.
#[derive(
    Deserialize,
    Serialize,
    JsonSchema,
    Debug,
    PartialEq,
    Hash,
    Eq,
    Copy,
    Clone,
    EnumString,
    strum::Display,
    Ord,
    PartialOrd,
)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// Parse the extension part of a crop URL (`200.jpg` -> `Jpeg`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }
}

impl MimeType for OutputFormat {
    fn mime_type(&self) -> &str {
        match &self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }
}
