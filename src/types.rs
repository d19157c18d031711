//! Shared types: the persisted photo record and the filter settings that
//! drive region selection.
//!
//! These types are serialized into the record store and must stay
//! backward-compatible with records written by earlier versions. Field names
//! on disk are camelCase (`textOfInterest`, `faceOperation`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Publish state of a photo record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoStatus {
    /// Created or edited, derivatives for the next version not yet committed.
    Uploading,
    /// Derivatives exist for the record's current `version`.
    Uploaded,
}

/// Privacy transform applied to the selected regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operation {
    /// Blur the selected regions, keep everything else sharp.
    #[default]
    Blur,
    /// Keep the selected regions sharp, blur everything else.
    Focus,
    /// Paint the selected regions solid black.
    Redact,
}

impl FromStr for Operation {
    type Err = Infallible;

    /// Unrecognised names fall back to [`Operation::Blur`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Focus" => Operation::Focus,
            "Redact" => Operation::Redact,
            _ => Operation::Blur,
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Blur => "Blur",
            Operation::Focus => "Focus",
            Operation::Redact => "Redact",
        })
    }
}

/// Whether detected logo regions are part of the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogoDetection {
    #[default]
    Yes,
    No,
}

impl FromStr for LogoDetection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(LogoDetection::Yes),
            "No" => Ok(LogoDetection::No),
            other => Err(format!("unknown logo detection '{other}' (expected Yes or No)")),
        }
    }
}

impl fmt::Display for LogoDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogoDetection::Yes => "Yes",
            LogoDetection::No => "No",
        })
    }
}

/// Which detected faces are part of the mask, by expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FaceOperation {
    #[default]
    All,
    Happy,
    Sad,
    Angry,
    Surprised,
    None,
}

impl FromStr for FaceOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "All" => Ok(FaceOperation::All),
            "Happy" => Ok(FaceOperation::Happy),
            "Sad" => Ok(FaceOperation::Sad),
            "Angry" => Ok(FaceOperation::Angry),
            "Surprised" => Ok(FaceOperation::Surprised),
            "None" => Ok(FaceOperation::None),
            other => Err(format!(
                "unknown face operation '{other}' (expected All, Happy, Sad, Angry, Surprised or None)"
            )),
        }
    }
}

impl fmt::Display for FaceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaceOperation::All => "All",
            FaceOperation::Happy => "Happy",
            FaceOperation::Sad => "Sad",
            FaceOperation::Angry => "Angry",
            FaceOperation::Surprised => "Surprised",
            FaceOperation::None => "None",
        })
    }
}

/// Text-of-interest filter.
///
/// Empty, `*`, and `all` are wildcards meaning "the aggregate text box".
/// Anything else is a case-insensitive substring matched against individual
/// text fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextFilter(String);

impl TextFilter {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `all` is matched case-sensitively, like `*`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.0.as_str(), "" | "*" | "all")
    }
}

impl Default for TextFilter {
    fn default() -> Self {
        Self("*".to_string())
    }
}

impl FromStr for TextFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// User-chosen settings for the next publish of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    pub operation: Operation,
    pub text_of_interest: TextFilter,
    pub logo_detection: LogoDetection,
    pub face_operation: FaceOperation,
}

/// One logical photo, as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: String,
    /// `0` until the first publish, then bumped by exactly one per publish.
    pub version: u64,
    pub status: PhotoStatus,
    pub created: DateTime<Utc>,
    #[serde(flatten)]
    pub filters: Filters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Raw annotation payload from the last publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Value>,
}

impl PhotoRecord {
    /// A fresh record awaiting its first publish.
    pub fn new(id: impl Into<String>, filters: Filters, created: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            status: PhotoStatus::Uploading,
            created,
            filters,
            filename: None,
            color: None,
            labels: Vec::new(),
            annotations: None,
        }
    }

    /// Name of this record's artifact at its current version.
    pub fn artifact_name(&self, kind: ArtifactKind) -> String {
        artifact_name(&self.id, self.version, kind)
    }
}

/// The three stored images of a published version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Original,
    FullSize,
    Thumbnail,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Original,
        ArtifactKind::FullSize,
        ArtifactKind::Thumbnail,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Original => "original",
            ArtifactKind::FullSize => "fullsize",
            ArtifactKind::Thumbnail => "thumbnail",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.suffix() == suffix)
    }
}

/// Content type every artifact is stored with.
pub const ARTIFACT_CONTENT_TYPE: &str = "image/jpeg";

/// `{id}_{version}-{kind}.jpeg`
pub fn artifact_name(id: &str, version: u64, kind: ArtifactKind) -> String {
    format!("{}_{}-{}.jpeg", id, version, kind.suffix())
}

/// Parsed form of an artifact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub id: String,
    pub version: u64,
    pub kind: ArtifactKind,
}

/// Inverse of [`artifact_name`]. Returns `None` for names that do not follow
/// the convention.
///
/// The id may itself contain underscores; the version is taken after the
/// last one.
pub fn parse_artifact_name(name: &str) -> Option<ArtifactName> {
    let stem = name.strip_suffix(".jpeg")?;
    let (head, suffix) = stem.rsplit_once('-')?;
    let kind = ArtifactKind::from_suffix(suffix)?;
    let (id, version) = head.rsplit_once('_')?;
    if id.is_empty() {
        return None;
    }
    let version = version.parse().ok()?;
    Some(ArtifactName {
        id: id.to_string(),
        version,
        kind,
    })
}
