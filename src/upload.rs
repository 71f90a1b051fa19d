//! Image uploads: per-slot validation and preview handle bookkeeping.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::locale::Localized;

/// Default upload ceiling: 5 MiB.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// MIME types accepted by default.
pub const ALLOWED_FILE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Reasons an upload is refused before it reaches session state.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{file_name} is {size} bytes, limit is {limit} bytes")]
    TooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },

    #[error("{file_name} has unsupported type {content_type}")]
    UnsupportedType {
        file_name: String,
        content_type: String,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One of the three image inputs the generation service needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadSlot {
    PersonPhoto,
    TopGarment,
    BottomGarment,
}

impl UploadSlot {
    pub const ALL: [UploadSlot; 3] = [
        UploadSlot::PersonPhoto,
        UploadSlot::TopGarment,
        UploadSlot::BottomGarment,
    ];

    /// Multipart field name expected by the generation endpoint.
    pub fn field_name(&self) -> &'static str {
        match self {
            UploadSlot::PersonPhoto => "person_photo",
            UploadSlot::TopGarment => "custom_top_garment",
            UploadSlot::BottomGarment => "custom_bottom_garment",
        }
    }

    pub fn label(&self) -> Localized {
        match self {
            UploadSlot::PersonPhoto => Localized::new("Your Photo", "个人照片"),
            UploadSlot::TopGarment => Localized::new("Top Garment", "上衣"),
            UploadSlot::BottomGarment => Localized::new("Bottom Garment", "下装"),
        }
    }

    fn index(&self) -> usize {
        match self {
            UploadSlot::PersonPhoto => 0,
            UploadSlot::TopGarment => 1,
            UploadSlot::BottomGarment => 2,
        }
    }
}

impl fmt::Display for UploadSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A user-selected image held in memory.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Arc<Vec<u8>>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: Arc::new(bytes),
        }
    }

    /// Read an image from disk, detecting its MIME type from magic bytes.
    ///
    /// Files larger than [`MAX_FILE_SIZE`] are refused from their metadata
    /// without being read. Use [`UploadPolicy::load`] for a custom limit.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        Self::read_limited(path, MAX_FILE_SIZE)
    }

    /// Falls back to the file extension when the content is not recognized,
    /// and to `application/octet-stream` when neither helps (the policy will
    /// then reject it).
    fn read_limited(path: &Path, limit: u64) -> Result<Self, UploadError> {
        let read_error = |source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let size = std::fs::metadata(path).map_err(read_error)?.len();
        if size > limit {
            return Err(UploadError::TooLarge {
                file_name,
                size,
                limit,
            });
        }
        let bytes = std::fs::read(path).map_err(read_error)?;

        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| mime_from_extension(path).map(String::from))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Size and type limits applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub allowed_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_FILE_SIZE,
            allowed_types: ALLOWED_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl UploadPolicy {
    /// Read a file from disk and validate it, refusing oversized files
    /// before their contents are loaded.
    pub fn load(&self, path: &Path) -> Result<ImageUpload, UploadError> {
        let upload = ImageUpload::read_limited(path, self.max_bytes)?;
        self.validate(&upload)?;
        Ok(upload)
    }

    /// Size is checked before type.
    pub fn validate(&self, upload: &ImageUpload) -> Result<(), UploadError> {
        if upload.size() > self.max_bytes {
            return Err(UploadError::TooLarge {
                file_name: upload.file_name.clone(),
                size: upload.size(),
                limit: self.max_bytes,
            });
        }
        if !self
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&upload.content_type))
        {
            return Err(UploadError::UnsupportedType {
                file_name: upload.file_name.clone(),
                content_type: upload.content_type.clone(),
            });
        }
        Ok(())
    }
}

/// Allocates preview handles and tracks which are still live.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> PreviewHandle {
        let url = format!("preview://{}", uuid::Uuid::new_v4());
        if let Ok(mut live) = self.live.lock() {
            live.insert(url.clone());
        }
        PreviewHandle {
            url,
            registry: Arc::clone(&self.live),
        }
    }

    /// Number of handles that have not been released yet.
    pub fn live(&self) -> usize {
        self.live.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.lock().map(|l| l.contains(url)).unwrap_or(false)
    }
}

/// A local preview reference; revoked when dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    registry: Arc<Mutex<HashSet<String>>>,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Ok(mut live) = self.registry.lock() {
            live.remove(&self.url);
        }
        tracing::trace!(url = %self.url, "Preview revoked");
    }
}

/// An accepted upload paired with its preview handle.
#[derive(Debug)]
pub struct UploadPreview {
    pub upload: ImageUpload,
    pub preview: PreviewHandle,
}

/// The three upload slots of a session.
#[derive(Debug, Default)]
pub struct Uploads {
    slots: [Option<UploadPreview>; 3],
    previews: PreviewRegistry,
}

impl Uploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(previews: PreviewRegistry) -> Self {
        Self {
            slots: Default::default(),
            previews,
        }
    }

    /// Validate `upload` and place it in `slot`.
    ///
    /// On rejection the slot keeps whatever it held before. On acceptance
    /// the previous preview is released before the new one is allocated.
    pub fn set(
        &mut self,
        slot: UploadSlot,
        upload: ImageUpload,
        policy: &UploadPolicy,
    ) -> Result<&UploadPreview, UploadError> {
        policy.validate(&upload)?;

        let entry = &mut self.slots[slot.index()];
        *entry = None;
        let preview = self.previews.allocate();
        tracing::debug!(
            slot = %slot,
            file = %upload.file_name,
            size = upload.size(),
            "Upload accepted"
        );
        Ok(&*entry.insert(UploadPreview { upload, preview }))
    }

    pub fn clear(&mut self, slot: UploadSlot) {
        self.slots[slot.index()] = None;
    }

    pub fn get(&self, slot: UploadSlot) -> Option<&UploadPreview> {
        self.slots[slot.index()].as_ref()
    }

    /// Slots that still need an image, in declaration order.
    pub fn missing(&self) -> Vec<UploadSlot> {
        UploadSlot::ALL
            .into_iter()
            .filter(|s| self.get(*s).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Cloned uploads for all three slots, or the list of missing slots.
    pub fn images(&self) -> Result<UploadImages, Vec<UploadSlot>> {
        match (
            self.get(UploadSlot::PersonPhoto),
            self.get(UploadSlot::TopGarment),
            self.get(UploadSlot::BottomGarment),
        ) {
            (Some(p), Some(t), Some(b)) => Ok(UploadImages {
                person_photo: p.upload.clone(),
                top_garment: t.upload.clone(),
                bottom_garment: b.upload.clone(),
            }),
            _ => Err(self.missing()),
        }
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.previews
    }
}

/// The complete image set sent with a submission.
#[derive(Debug, Clone)]
pub struct UploadImages {
    pub person_photo: ImageUpload,
    pub top_garment: ImageUpload,
    pub bottom_garment: ImageUpload,
}

impl UploadImages {
    pub fn get(&self, slot: UploadSlot) -> &ImageUpload {
        match slot {
            UploadSlot::PersonPhoto => &self.person_photo,
            UploadSlot::TopGarment => &self.top_garment,
            UploadSlot::BottomGarment => &self.bottom_garment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn jpeg(size: usize) -> ImageUpload {
        ImageUpload::new("photo.jpg", "image/jpeg", vec![0u8; size])
    }

    #[test]
    fn test_policy_rejects_oversize_before_type() {
        let policy = UploadPolicy::default();
        let upload = ImageUpload::new("huge.gif", "image/gif", vec![0u8; MAX_FILE_SIZE as usize + 1]);
        assert!(matches!(policy.validate(&upload), Err(UploadError::TooLarge { .. })));
    }

    #[test]
    fn test_policy_rejects_disallowed_type() {
        let policy = UploadPolicy::default();
        let upload = ImageUpload::new("anim.gif", "image/gif", vec![0u8; 10]);
        assert!(matches!(
            policy.validate(&upload),
            Err(UploadError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_policy_accepts_exact_limit() {
        let policy = UploadPolicy::default();
        assert!(policy.validate(&jpeg(MAX_FILE_SIZE as usize)).is_ok());
    }

    #[test]
    fn test_rejected_upload_leaves_slot_unchanged() {
        let policy = UploadPolicy::default();
        let mut uploads = Uploads::new();
        uploads.set(UploadSlot::PersonPhoto, jpeg(100), &policy).unwrap();
        let before = uploads.get(UploadSlot::PersonPhoto).unwrap().preview.url().to_string();

        let bad = ImageUpload::new("doc.pdf", "application/pdf", vec![1, 2, 3]);
        assert!(uploads.set(UploadSlot::PersonPhoto, bad, &policy).is_err());

        let after = uploads.get(UploadSlot::PersonPhoto).unwrap();
        assert_eq!(after.preview.url(), before);
        assert_eq!(after.upload.file_name, "photo.jpg");
        assert_eq!(uploads.registry().live(), 1);
    }

    #[test]
    fn test_replacing_upload_revokes_previous_preview() {
        let policy = UploadPolicy::default();
        let mut uploads = Uploads::new();
        let first = uploads
            .set(UploadSlot::TopGarment, jpeg(10), &policy)
            .unwrap()
            .preview
            .url()
            .to_string();
        uploads.set(UploadSlot::TopGarment, jpeg(20), &policy).unwrap();

        assert!(!uploads.registry().is_live(&first));
        assert_eq!(uploads.registry().live(), 1);

        uploads.clear(UploadSlot::TopGarment);
        assert_eq!(uploads.registry().live(), 0);
    }

    #[test]
    fn test_missing_slots_in_order() {
        let policy = UploadPolicy::default();
        let mut uploads = Uploads::new();
        assert_eq!(uploads.missing(), UploadSlot::ALL.to_vec());
        uploads.set(UploadSlot::TopGarment, jpeg(10), &policy).unwrap();
        assert_eq!(
            uploads.missing(),
            vec![UploadSlot::PersonPhoto, UploadSlot::BottomGarment]
        );
        assert!(uploads.images().is_err());
    }

    #[test]
    fn test_dropping_uploads_releases_all_previews() {
        let policy = UploadPolicy::default();
        let registry = PreviewRegistry::new();
        {
            let mut uploads = Uploads::with_registry(registry.clone());
            for slot in UploadSlot::ALL {
                uploads.set(slot, jpeg(10), &policy).unwrap();
            }
            assert!(uploads.is_complete());
            assert_eq!(registry.live(), 3);
        }
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_from_path_sniffs_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garment.bin");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0])
            .unwrap();

        let upload = ImageUpload::from_path(&path).unwrap();
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.file_name, "garment.bin");
    }

    #[test]
    fn test_from_path_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.webp");
        std::fs::write(&path, b"not really an image").unwrap();

        let upload = ImageUpload::from_path(&path).unwrap();
        assert_eq!(upload.content_type, "image/webp");
    }

    #[test]
    fn test_oversized_file_refused_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.jpg");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_FILE_SIZE + 1).unwrap();

        let err = ImageUpload::from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            UploadError::TooLarge { ref file_name, size, limit }
                if file_name == "huge.jpg" && size == MAX_FILE_SIZE + 1 && limit == MAX_FILE_SIZE
        ));
    }

    #[test]
    fn test_policy_load_applies_its_own_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]).unwrap();

        let tight = UploadPolicy {
            max_bytes: 8,
            ..UploadPolicy::default()
        };
        assert!(matches!(tight.load(&path), Err(UploadError::TooLarge { limit: 8, .. })));

        let upload = UploadPolicy::default().load(&path).unwrap();
        assert_eq!(upload.content_type, "image/png");

        let gif = dir.path().join("anim.gif");
        std::fs::write(&gif, b"GIF89a\x01\x00").unwrap();
        assert!(matches!(
            UploadPolicy::default().load(&gif),
            Err(UploadError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = ImageUpload::from_path(Path::new("/definitely/not/here.jpg"));
        assert!(matches!(result, Err(UploadError::Read { .. })));
    }
}
