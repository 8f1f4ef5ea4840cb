//! Upload safety checks and MIME guessing.
//!
//! Uploads are rejected when oversized, when the extension is on the
//! blocklist, or when the leading bytes identify an executable.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Magic byte signatures for executable files
pub const MAGIC_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows PE/MZ", &[0x4D, 0x5A]),
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),
    ("Mach-O 32", &[0xFE, 0xED, 0xFA, 0xCE]),
    ("Mach-O 64", &[0xFE, 0xED, 0xFA, 0xCF]),
    ("Mach-O Fat", &[0xCA, 0xFE, 0xBA, 0xBE]),
    ("WebAssembly", &[0x00, 0x61, 0x73, 0x6D]),
];

/// Blocked file extensions (case-insensitive)
static BLOCKED_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "exe", "dll", "scr", "pif", "com", "msi", "bat", "cmd", "ps1", "vbs", "so", "dylib",
        "jar", "class", "deb", "rpm", "apk", "app", "dmg", "pkg", "xlsm", "docm", "pptm", "reg",
        "lnk", "hta",
    ]
    .into_iter()
    .collect()
});

/// Result of file safety validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub allowed: bool,
    pub block_reason: Option<String>,
}

impl ValidationResult {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            block_reason: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            block_reason: Some(reason.into()),
        }
    }
}

/// Lowercased extension of `filename`, if it has one.
pub fn extension(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_lowercase()),
        _ => None,
    }
}

/// Validate an upload before it is persisted.
pub fn validate_file(filename: &str, data: &[u8], max_size_bytes: u64) -> ValidationResult {
    if data.is_empty() {
        return ValidationResult::blocked("File is empty");
    }

    if data.len() as u64 > max_size_bytes {
        return ValidationResult::blocked(format!(
            "File exceeds maximum size of {} bytes",
            max_size_bytes
        ));
    }

    if let Some(ext) = extension(filename) {
        if BLOCKED_EXTENSIONS.contains(ext.as_str()) {
            return ValidationResult::blocked(format!("File extension .{} is not allowed", ext));
        }
    }

    for (name, magic) in MAGIC_SIGNATURES {
        if data.len() >= magic.len() && &data[..magic.len()] == *magic {
            return ValidationResult::blocked(format!("Executable file detected: {}", name));
        }
    }

    ValidationResult::allowed()
}

/// MIME type for an upload, from its extension first and magic bytes second.
pub fn guess_mime_type(filename: &str, data: &[u8]) -> String {
    if let Some(mime) = extension(filename).and_then(|ext| mime_from_extension(&ext)) {
        return mime.to_string();
    }
    infer::get(data)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "xls" => Some("application/vnd.ms-excel"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "ppt" => Some("application/vnd.ms-powerpoint"),
        "pptx" => {
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        }
        "odt" => Some("application/vnd.oasis.opendocument.text"),
        "zip" => Some("application/zip"),
        "txt" | "log" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "md" | "markdown" => Some("text/markdown"),
        "html" | "htm" => Some("text/html"),
        "json" => Some("application/json"),
        "yaml" | "yml" => Some("application/yaml"),
        "xml" => Some("application/xml"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "mp4" => Some("video/mp4"),
        "mp3" => Some("audio/mpeg"),
        _ => None,
    }
}

/// Sanitize filename for safe storage
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' | '#' | '%' => '_',
            c if c.is_whitespace() => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim_matches(['.', '-', '_']);
    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    if sanitized.len() > 120 {
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            if ext.len() < 16 {
                let mut cut = 120 - ext.len();
                while !sanitized.is_char_boundary(cut) {
                    cut -= 1;
                }
                return format!("{}{}", &sanitized[..cut], ext);
            }
        }
        let mut cut = 120;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        return sanitized[..cut].to_string();
    }

    sanitized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_exe_extension() {
        let result = validate_file("setup.EXE", b"hello", 1024);
        assert!(!result.allowed);
        assert!(result.block_reason.unwrap().contains(".exe"));
    }

    #[test]
    fn test_blocks_elf_magic() {
        let result = validate_file("notes.pdf", &[0x7F, 0x45, 0x4C, 0x46, 0x02], 1024);
        assert!(!result.allowed);
    }

    #[test]
    fn test_blocks_oversized_and_empty() {
        assert!(!validate_file("a.pdf", &[0u8; 11], 10).allowed);
        assert!(!validate_file("a.pdf", &[], 10).allowed);
    }

    #[test]
    fn test_allows_pdf() {
        assert_eq!(
            validate_file("manual.pdf", b"%PDF-1.7 ...", 1024),
            ValidationResult::allowed()
        );
    }

    #[test]
    fn test_guess_mime_by_extension_then_magic() {
        assert_eq!(guess_mime_type("deck.PPTX", b"PK.."), crate::file_safety::mime_from_extension("pptx").unwrap());
        assert_eq!(guess_mime_type("noext", b"%PDF-1.4"), "application/pdf");
        assert_eq!(guess_mime_type("noext", b"??"), "application/octet-stream");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("a/b/Guide.Final.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension(".bashrc"), None);
        assert_eq!(extension("README"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("My Deck: v2?.pptx"), "My-Deck_-v2_.pptx");
        assert_eq!(sanitize_filename("..."), "unnamed_file");
        let long = format!("{}.pdf", "a".repeat(300));
        let out = sanitize_filename(&long);
        assert_eq!(out.len(), 120);
        assert!(out.ends_with(".pdf"));
    }
}
