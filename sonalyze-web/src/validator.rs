//! Upload validation and filename sanitizing

use thiserror::Error;

/// Accepted audio extensions (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Reason an upload was refused; the message is shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("No file part")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("Unsupported file format. Only .mp3 and .wav are allowed.")]
    UnsupportedFormat,

    #[error("Invalid file name")]
    InvalidFileName,

    #[error("Uploaded file is empty")]
    EmptyFile,
}

/// True when `name` ends in an allowed extension
pub fn has_allowed_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Non-ASCII characters are dropped, path separators and whitespace runs
/// become `_`, anything outside `[A-Za-z0-9_.-]` is removed, and leading or
/// trailing `.`/`_` are trimmed. The result may be empty.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Validate an uploaded file and return the name to store it under
///
/// `filename` is the name the client sent with the `file` part (`None` when
/// the part carried no filename).
pub fn validate_upload(filename: Option<&str>, bytes_len: usize) -> Result<String, UploadRejection> {
    let filename = filename.map(str::trim).unwrap_or_default();
    if filename.is_empty() {
        return Err(UploadRejection::NoSelectedFile);
    }

    if !has_allowed_extension(filename) {
        return Err(UploadRejection::UnsupportedFormat);
    }

    let sanitized = secure_filename(filename);
    if sanitized.is_empty() || !has_allowed_extension(&sanitized) {
        return Err(UploadRejection::InvalidFileName);
    }

    if bytes_len == 0 {
        return Err(UploadRejection::EmptyFile);
    }

    Ok(sanitized)
}
