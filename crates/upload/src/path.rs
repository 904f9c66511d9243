//! Storage path generation.

use cheezy_experience_model::TimestampMs;

const MAX_NAME_CHARS: usize = 80;

/// Reduce a file name to `[A-Za-z0-9._-]`.
///
/// Other characters become `_`, leading dots are dropped so the result is
/// never hidden or relative, and an empty result falls back to `upload`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');

    // Keep the extension when truncating long names.
    let shortened = if trimmed.chars().count() > MAX_NAME_CHARS {
        match trimmed.rfind('.') {
            Some(dot) if trimmed.len() - dot <= 10 => {
                let ext = &trimmed[dot..];
                let stem: String = trimmed[..dot]
                    .chars()
                    .take(MAX_NAME_CHARS - ext.len())
                    .collect();
                format!("{stem}{ext}")
            }
            _ => trimmed.chars().take(MAX_NAME_CHARS).collect(),
        }
    } else {
        trimmed.to_string()
    };

    if shortened.is_empty() {
        "upload".to_string()
    } else {
        shortened
    }
}

/// `<prefix>/<createdAt>_<nonce>_<name>`, with an 8 hex char random nonce.
pub fn storage_path(prefix: &str, created_at: TimestampMs, file_name: &str) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let name = sanitize_file_name(file_name);
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{created_at}_{}_{name}", &nonce[..8])
    } else {
        format!("{prefix}/{created_at}_{}_{name}", &nonce[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_file_name("photo_17.png"), "photo_17.png");
        assert_eq!(sanitize_file_name("my holiday (1).mp4"), "my_holiday__1_.mp4");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\cat.jpg"), "cat.jpg");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name("..."), "upload");
        assert_eq!(sanitize_file_name("été.png"), "_t_.png");
    }

    #[test]
    fn test_long_names_keep_extension() {
        let long = format!("{}.mp4", "a".repeat(200));
        let out = sanitize_file_name(&long);
        assert_eq!(out.len(), MAX_NAME_CHARS);
        assert!(out.ends_with(".mp4"));
    }

    #[test]
    fn test_storage_path_shape() {
        let path = storage_path("experiences/", 1_718_000_000_000, "cat pic.png");
        let rest = path.strip_prefix("experiences/").unwrap();
        let parts: Vec<&str> = rest.splitn(3, '_').collect();
        assert_eq!(parts[0], "1718000000000");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[2], "cat_pic.png");
    }

    #[test]
    fn test_same_name_same_millisecond_differs() {
        let a = storage_path("experiences", 5, "a.png");
        let b = storage_path("experiences", 5, "a.png");
        assert_ne!(a, b);
    }
}
