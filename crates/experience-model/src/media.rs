//! Finished media blobs.

use crate::experience::MediaType;

/// A finished, self-contained piece of media ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    /// Original file name; becomes part of the storage path.
    pub file_name: String,

    /// MIME type of `data`.
    pub mime_type: String,

    pub media_type: MediaType,

    pub data: Vec<u8>,
}

impl MediaBlob {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        media_type: MediaType,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            media_type,
            data,
        }
    }

    /// Wrap a file chosen from the gallery or the native picker.
    ///
    /// The media type comes from the MIME type when one is known, otherwise
    /// from the file extension.
    pub fn from_file(file_name: impl Into<String>, mime_type: Option<&str>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let (media_type, mime) = match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
            Some(mime) => (MediaType::from_mime(mime), mime.to_string()),
            None => {
                let media_type = MediaType::from_file_name(&file_name);
                (media_type, guess_mime(&file_name, media_type).to_string())
            }
        };
        Self {
            file_name,
            mime_type: mime,
            media_type,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBlob")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("media_type", &self.media_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn guess_mime(file_name: &str, media_type: MediaType) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => match media_type {
            MediaType::Image => "application/octet-stream",
            MediaType::Video => "video/mp4",
        },
    }
}
