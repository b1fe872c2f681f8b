//! Test doubles for the compose flow.

use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use realtyfeed_api::{ApiError, ApiFuture, FeedApi};
use realtyfeed_protocol::messages::{
    CreatePostRequest, MediaRecord, ModerationAction, PresignRequest, PresignResponse,
    RemoteMedia, UpdatePostRequest,
};
use realtyfeed_protocol::{Author, Comment, InteractionKind, MediaItem, Post, PostPatch};
use realtyfeed_transfer::{LocalFile, ProgressSink, TransferError, TransferFuture, Transport};

const MTIME: i64 = 1_700_000_000_000;

pub(crate) fn server_error() -> ApiError {
    ApiError::Api {
        status: 500,
        body: "boom".into(),
    }
}

/// Server double. Credential responses always use the slug `batch-1`.
#[derive(Default)]
pub(crate) struct MockApi {
    /// Positions in a credential request that get an empty record.
    pub missing_records: Vec<usize>,
    pub(crate) presigns: Mutex<Vec<PresignRequest>>,
    pub(crate) confirms: Mutex<Vec<Vec<String>>>,
    pub(crate) creates: Mutex<Vec<CreatePostRequest>>,
    pub(crate) updates: Mutex<Vec<(String, UpdatePostRequest)>>,
    pub(crate) fail_presign: AtomicBool,
    pub(crate) fail_confirm: AtomicBool,
    pub(crate) hang_confirm: AtomicBool,
    pub(crate) fail_create: AtomicBool,
    pub(crate) next_uuid: AtomicUsize,
}

impl MockApi {
    pub fn presign_requests(&self) -> Vec<PresignRequest> {
        self.presigns.lock().unwrap().clone()
    }

    pub fn confirmed_ids(&self) -> Vec<Vec<String>> {
        self.confirms.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CreatePostRequest> {
        self.creates.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<(String, UpdatePostRequest)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn fail_next_presign(&self) {
        self.fail_presign.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_confirm(&self) {
        self.fail_confirm.store(true, Ordering::SeqCst);
    }

    /// The next confirmation never answers.
    pub fn hang_next_confirm(&self) {
        self.hang_confirm.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }
}

impl FeedApi for MockApi {
    fn presign<'a>(&'a self, request: &'a PresignRequest) -> ApiFuture<'a, PresignResponse> {
        Box::pin(async move {
            self.presigns.lock().unwrap().push(request.clone());
            if self.fail_presign.swap(false, Ordering::SeqCst) {
                return Err(server_error());
            }
            let media_records = request
                .medias
                .iter()
                .enumerate()
                .map(|(i, media)| {
                    if self.missing_records.contains(&i) {
                        return MediaRecord {
                            media: None,
                            presigned_url: None,
                        };
                    }
                    let n = self.next_uuid.fetch_add(1, Ordering::SeqCst);
                    MediaRecord {
                        media: Some(RemoteMedia {
                            uuid: format!("uuid-{n}"),
                            mime_type: media.mime_type.clone(),
                        }),
                        presigned_url: Some(format!(
                            "https://storage.test/{n}/{}",
                            media.file_name
                        )),
                    }
                })
                .collect();
            Ok(PresignResponse {
                slug: "batch-1".into(),
                media_records,
            })
        })
    }

    fn confirm_uploaded<'a>(&'a self, media_ids: &'a [String]) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            if self.hang_confirm.swap(false, Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_confirm.swap(false, Ordering::SeqCst) {
                return Err(server_error());
            }
            self.confirms.lock().unwrap().push(media_ids.to_vec());
            Ok(())
        })
    }

    fn get_post<'a>(&'a self, _post_id: &'a str) -> ApiFuture<'a, Post> {
        Box::pin(async { Err(ApiError::EmptyData) })
    }

    /// Answers with a fresh id, zeroed counters and trimmed text.
    fn create_post<'a>(&'a self, request: &'a CreatePostRequest) -> ApiFuture<'a, PostPatch> {
        Box::pin(async move {
            self.creates.lock().unwrap().push(request.clone());
            if self.fail_create.swap(false, Ordering::SeqCst) {
                return Err(server_error());
            }
            let n = self.creates.lock().unwrap().len();
            let mut patch = PostPatch::new(format!("post-{n}"));
            patch.slug = request.media_slug.clone();
            patch.text = Some(request.text.trim().to_string());
            patch.like_count = Some(0);
            patch.comment_count = Some(0);
            Ok(patch)
        })
    }

    /// Echoes the changed text only.
    fn update_post<'a>(
        &'a self,
        post_id: &'a str,
        request: &'a UpdatePostRequest,
    ) -> ApiFuture<'a, PostPatch> {
        Box::pin(async move {
            self.updates
                .lock()
                .unwrap()
                .push((post_id.to_string(), request.clone()));
            let mut patch = PostPatch::new(post_id);
            patch.text = request.text.clone();
            Ok(patch)
        })
    }

    fn delete_post<'a>(&'a self, _post_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn hide_post<'a>(&'a self, _post_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn set_interaction<'a>(
        &'a self,
        _post_id: &'a str,
        _kind: InteractionKind,
        _on: bool,
    ) -> ApiFuture<'a, Option<PostPatch>> {
        Box::pin(async { Ok(None) })
    }

    fn create_comment<'a>(&'a self, _post_id: &'a str, _text: &'a str) -> ApiFuture<'a, Comment> {
        Box::pin(async { Err(ApiError::EmptyData) })
    }

    fn moderate_comment<'a>(
        &'a self,
        _comment_id: &'a str,
        _action: ModerationAction,
    ) -> ApiFuture<'a, Option<Comment>> {
        Box::pin(async { Ok(None) })
    }

    fn delete_comment<'a>(&'a self, _comment_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }
}

/// Storage double. Reports half, then all, then completion.
#[derive(Default)]
pub(crate) struct MockTransport {
    puts: Mutex<Vec<(String, String, usize)>>,
    /// URL suffixes that answer 500.
    failing: Mutex<Vec<String>>,
    hang: bool,
}

impl MockTransport {
    pub fn failing(suffixes: &[&str]) -> Self {
        Self {
            failing: Mutex::new(suffixes.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    /// Transport whose transfers never finish.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// `(url, mime type, body length)` per transfer attempt.
    pub fn puts(&self) -> Vec<(String, String, usize)> {
        self.puts.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn put<'a>(
        &'a self,
        body: Bytes,
        url: &'a str,
        mime_type: &'a str,
        progress: ProgressSink,
    ) -> TransferFuture<'a> {
        Box::pin(async move {
            self.puts
                .lock()
                .unwrap()
                .push((url.to_string(), mime_type.to_string(), body.len()));
            if self.hang {
                std::future::pending::<()>().await;
            }

            let total = body.len() as u64;
            progress.report(total / 2, total);
            if self.failing.lock().unwrap().iter().any(|s| url.ends_with(s)) {
                return Err(TransferError::Status {
                    status: 500,
                    body: "storage unavailable".into(),
                });
            }
            progress.report(total, total);
            progress.complete(total);
            Ok(())
        })
    }
}

pub(crate) fn image_file(name: &str, size: usize) -> LocalFile {
    LocalFile::new(name, MTIME, "image/jpeg", vec![7u8; size])
}

pub(crate) fn video_file(name: &str, size: usize) -> LocalFile {
    LocalFile::new(name, MTIME, "video/mp4", vec![3u8; size])
}

/// A PNG of pseudo-random pixels, which deflate cannot shrink.
pub(crate) fn noisy_png_file(name: &str, width: u32, height: u32) -> LocalFile {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let img = image::RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let [r, g, b, ..] = (state >> 32).to_le_bytes();
        image::Rgb([r, g, b])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    LocalFile::new(name, MTIME, "image/png", buf)
}

pub(crate) fn viewer() -> Author {
    Author {
        id: "u1".into(),
        name: "Dana".into(),
        avatar_url: None,
    }
}

/// Post `p1` with slug `sunny-loft`, one image `m1` and five likes.
pub(crate) fn existing_post() -> Post {
    let mut patch = PostPatch::new("p1");
    patch.slug = Some("sunny-loft".into());
    patch.author = Some(viewer());
    patch.text = Some("Sunny loft near the park".into());
    patch.media = Some(vec![MediaItem {
        id: "m1".into(),
        url: "https://cdn.test/m1.jpg".into(),
        mime_type: "image/jpeg".into(),
    }]);
    patch.like_count = Some(5);
    patch.into_post().unwrap()
}
