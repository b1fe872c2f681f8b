fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use realtyfeed_protocol::messages::{
        CreatePostRequest, FileUploadedRequest, PresignRequest, PresignResponse,
        UpdatePostRequest,
    };
    use realtyfeed_protocol::{
        ApiResponse, Comment, CommentPermission, MediaKind, ModerationState, Post, PostPatch,
        Visibility,
    };

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture, re-serializes it and compares the JSON values
    /// (key order independent). Returns the parsed value for further checks.
    fn roundtrip<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  ours: {reserialized}"
        );
        parsed
    }

    // --- Requests ---

    #[test]
    fn fixture_presign_request() {
        let req = roundtrip::<PresignRequest>("presign_request.json");
        assert_eq!(req.mediable_type, "Post");
        assert_eq!(req.medias[1].file_type, MediaKind::Video);
        assert_eq!(req.medias.iter().filter(|m| m.is_primary).count(), 1);
    }

    #[test]
    fn fixture_file_uploaded_request() {
        let req = roundtrip::<FileUploadedRequest>("file_uploaded_request.json");
        assert_eq!(req.media_ids.len(), 2);
    }

    #[test]
    fn fixture_create_post_request() {
        let req = roundtrip::<CreatePostRequest>("create_post_request.json");
        assert_eq!(req.comment_permission, CommentPermission::Moderated);
        assert_eq!(req.group_id.as_deref(), Some("g-downtown"));
    }

    #[test]
    fn fixture_update_post_request() {
        let req = roundtrip::<UpdatePostRequest>("update_post_request.json");
        assert!(req.comment_permission.is_none());
        assert!(req.media_slug.is_none());
        assert!(!req.is_empty());
    }

    // --- Responses ---

    #[test]
    fn fixture_presign_response() {
        let resp = roundtrip::<ApiResponse<PresignResponse>>("presign_response.json");
        let data = resp.into_result().unwrap().unwrap();
        assert_eq!(data.slug, "sunny-loft-3f9a");
        assert!(data.media_records[0].credential().is_some());
        // Second record has no URL and cannot be used.
        assert!(data.media_records[1].credential().is_none());
    }

    #[test]
    fn fixture_post() {
        let resp = roundtrip::<ApiResponse<Post>>("post.json");
        let post = resp.into_result().unwrap().unwrap();
        assert_eq!(post.visibility, Visibility::OnlyMe);
        assert_eq!(post.comments.len(), 1);
        assert!(post.comments[0].is_approved());
        assert!(post.created_at.is_some());
    }

    #[test]
    fn fixture_post_patch() {
        let resp = roundtrip::<ApiResponse<PostPatch>>("post_patch.json");
        let patch = resp.into_result().unwrap().unwrap();
        assert!(patch.author.is_none());
        assert!(patch.media.is_none());
        assert_eq!(patch.like_count, Some(0));
    }

    #[test]
    fn fixture_interaction_echo_merges_over_post() {
        let patch = roundtrip::<ApiResponse<PostPatch>>("interaction_echo.json")
            .into_result()
            .unwrap()
            .unwrap();
        let mut post = roundtrip::<ApiResponse<Post>>("post.json")
            .into_result()
            .unwrap()
            .unwrap();

        post.merge(&patch);
        assert_eq!(post.like_count, 13);
        assert!(post.liked_by_viewer);
        assert_eq!(post.save_count, 3);
        assert_eq!(post.text, "Sunny loft near the park");
    }

    #[test]
    fn fixture_comment() {
        let comment = roundtrip::<ApiResponse<Comment>>("comment.json")
            .into_result()
            .unwrap()
            .unwrap();
        assert_eq!(comment.moderation_state, ModerationState::Pending);
        assert!(comment.author.avatar_url.is_none());
    }

    #[test]
    fn fixture_ack() {
        let resp = roundtrip::<ApiResponse<serde_json::Value>>("ack.json");
        assert_eq!(resp.into_result().unwrap(), None);
    }

    #[test]
    fn fixture_rejected() {
        let resp = roundtrip::<ApiResponse<serde_json::Value>>("rejected.json");
        assert_eq!(resp.into_result().unwrap_err(), "The media slug has expired");
    }
}
