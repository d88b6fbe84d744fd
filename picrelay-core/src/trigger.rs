//! Trigger matcher: decides whether an inbound message starts a
//! conversion.
//!
//! Matching is keyword-substring based over a fixed set, not full parsing;
//! when several keywords occur, the first in text order wins. The compiled
//! pattern is immutable and the matcher is a pure function, so concurrent
//! requests can share it freely.

use std::fmt;
use std::sync::LazyLock;

use image::ImageFormat;
use regex::Regex;

use crate::contract::Attachment;

static FORMAT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(jpeg|jpg|png|bmp|tiff|heic)").unwrap()
});

/// Recognized target formats. `Jpg` and `Jpeg` are distinct keywords and
/// produce distinct extensions, but share an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Jpeg,
    Jpg,
    Png,
    Bmp,
    Tiff,
    Heic,
}

impl TargetFormat {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_lowercase().as_str() {
            "jpeg" => Some(TargetFormat::Jpeg),
            "jpg" => Some(TargetFormat::Jpg),
            "png" => Some(TargetFormat::Png),
            "bmp" => Some(TargetFormat::Bmp),
            "tiff" => Some(TargetFormat::Tiff),
            "heic" => Some(TargetFormat::Heic),
            _ => None,
        }
    }

    /// File extension for the converted artifact, matching the keyword the
    /// user typed.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Jpg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Bmp => "bmp",
            TargetFormat::Tiff => "tiff",
            TargetFormat::Heic => "heic",
        }
    }

    /// Encoder format for the codec. `None` when the codec cannot encode
    /// this format (HEIC): the keyword is still recognized for trigger
    /// parity, and the conversion stage reports the unsupported target.
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self {
            TargetFormat::Jpeg | TargetFormat::Jpg => Some(ImageFormat::Jpeg),
            TargetFormat::Png => Some(ImageFormat::Png),
            TargetFormat::Bmp => Some(ImageFormat::Bmp),
            TargetFormat::Tiff => Some(ImageFormat::Tiff),
            TargetFormat::Heic => None,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Outcome of inspecting one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// No format keyword in the text: not addressed to us, no action.
    Ignore,
    /// Keyword plus at least one attachment: run the pipeline.
    Convert(TargetFormat),
    /// Keyword but an empty file list: the user asked for a conversion we
    /// cannot perform, which earns an error reply rather than silence.
    MissingAttachment,
}

/// Inspect a message's text and attachments. Only the first keyword match
/// is honored; likewise the pipeline only takes the first attachment
/// (intentional simplification carried over from the original bot).
pub fn match_trigger(text: &str, files: &[Attachment]) -> TriggerDecision {
    let Some(m) = FORMAT_KEYWORD.find(text) else {
        return TriggerDecision::Ignore;
    };
    // The pattern only matches strings from_keyword accepts.
    let Some(target) = TargetFormat::from_keyword(m.as_str()) else {
        return TriggerDecision::Ignore;
    };
    if files.is_empty() {
        return TriggerDecision::MissingAttachment;
    }
    TriggerDecision::Convert(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> Attachment {
        Attachment {
            url_private: "https://files.slack.com/files-pri/T1-F1/x.png".into(),
            name: "x.png".into(),
        }
    }

    #[test]
    fn first_keyword_wins() {
        let files = [attachment()];
        assert_eq!(
            match_trigger("to jpg or png please", &files),
            TriggerDecision::Convert(TargetFormat::Jpg)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let files = [attachment()];
        assert_eq!(
            match_trigger("TIFF me", &files),
            TriggerDecision::Convert(TargetFormat::Tiff)
        );
    }

    #[test]
    fn keyword_without_files_is_missing_attachment() {
        assert_eq!(
            match_trigger("png please", &[]),
            TriggerDecision::MissingAttachment
        );
    }

    #[test]
    fn no_keyword_is_ignored_with_or_without_files() {
        assert_eq!(match_trigger("hello there", &[]), TriggerDecision::Ignore);
        assert_eq!(
            match_trigger("hello there", &[attachment()]),
            TriggerDecision::Ignore
        );
    }

    #[test]
    fn jpeg_and_jpg_are_distinct_targets() {
        let files = [attachment()];
        assert_eq!(
            match_trigger("jpeg", &files),
            TriggerDecision::Convert(TargetFormat::Jpeg)
        );
        assert_eq!(TargetFormat::Jpeg.extension(), "jpeg");
        assert_eq!(TargetFormat::Jpg.extension(), "jpg");
        assert_eq!(
            TargetFormat::Jpeg.image_format(),
            TargetFormat::Jpg.image_format()
        );
    }

    #[test]
    fn heic_has_no_encoder() {
        assert_eq!(TargetFormat::Heic.image_format(), None);
    }
}
