use realtyfeed_protocol::MediaKind;

use crate::types::FileDescriptor;

/// Default cap for videos: 20 MiB.
pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 20 * 1024 * 1024;

/// Rejection of a single picked file. Never affects its siblings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{name}: unsupported file type {mime_type:?}")]
    UnsupportedType { name: String, mime_type: String },

    #[error("{name}: file is empty")]
    Empty { name: String },

    #[error("{name}: {size} bytes exceeds the {limit} byte limit for {kind:?} files")]
    SizeExceeded {
        name: String,
        kind: MediaKind,
        size: u64,
        limit: u64,
    },
}

/// Type and size policy applied before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPolicy {
    /// Cap for images before compression. `None` means uncapped.
    pub max_image_bytes: Option<u64>,
    /// Cap for videos, which are never compressed.
    pub max_video_bytes: Option<u64>,
}

impl Default for MediaPolicy {
    fn default() -> Self {
        Self {
            max_image_bytes: None,
            max_video_bytes: Some(DEFAULT_MAX_VIDEO_BYTES),
        }
    }
}

impl MediaPolicy {
    /// Size cap for a media kind.
    pub fn limit_for(&self, kind: MediaKind) -> Option<u64> {
        match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
        }
    }

    /// Checks one file and returns its media kind.
    pub fn validate(&self, file: &FileDescriptor) -> Result<MediaKind, ValidationError> {
        let kind = MediaKind::from_mime(&file.mime_type).ok_or_else(|| {
            ValidationError::UnsupportedType {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
            }
        })?;

        if file.size == 0 {
            return Err(ValidationError::Empty {
                name: file.name.clone(),
            });
        }

        if let Some(limit) = self.limit_for(kind)
            && file.size > limit
        {
            return Err(ValidationError::SizeExceeded {
                name: file.name.clone(),
                kind,
                size: file.size,
                limit,
            });
        }

        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn file(name: &str, mime_type: &str, size: u64) -> FileDescriptor {
        FileDescriptor {
            name: name.into(),
            modified_ms: 0,
            size,
            mime_type: mime_type.into(),
        }
    }

    #[test]
    fn accepts_video_under_cap() {
        let policy = MediaPolicy::default();
        assert_eq!(
            policy.validate(&file("tour.mp4", "video/mp4", 15 * MIB)),
            Ok(MediaKind::Video)
        );
    }

    #[test]
    fn rejects_video_over_cap() {
        let policy = MediaPolicy::default();
        let err = policy
            .validate(&file("tour.mp4", "video/mp4", 21 * MIB))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::SizeExceeded {
                kind: MediaKind::Video,
                limit: DEFAULT_MAX_VIDEO_BYTES,
                ..
            }
        ));
    }

    #[test]
    fn video_at_exact_cap_is_accepted() {
        let policy = MediaPolicy::default();
        assert!(
            policy
                .validate(&file("tour.mp4", "video/mp4", DEFAULT_MAX_VIDEO_BYTES))
                .is_ok()
        );
    }

    #[test]
    fn images_are_uncapped_by_default() {
        let policy = MediaPolicy::default();
        assert_eq!(
            policy.validate(&file("aerial.png", "image/png", 80 * MIB)),
            Ok(MediaKind::Image)
        );
    }

    #[test]
    fn image_cap_applies_when_configured() {
        let policy = MediaPolicy {
            max_image_bytes: Some(5 * MIB),
            ..Default::default()
        };
        assert!(policy.validate(&file("aerial.png", "image/png", 6 * MIB)).is_err());
    }

    #[test]
    fn rejects_unsupported_type() {
        let policy = MediaPolicy::default();
        let err = policy
            .validate(&file("contract.pdf", "application/pdf", 100))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
        assert!(err.to_string().contains("contract.pdf"));
    }

    #[test]
    fn rejects_empty_file() {
        let policy = MediaPolicy::default();
        assert_eq!(
            policy.validate(&file("blank.jpg", "image/jpeg", 0)),
            Err(ValidationError::Empty {
                name: "blank.jpg".into()
            })
        );
    }
}
