//! Storage layout - pure key computation, no I/O
//!
//! One folder per contact email. Keying the folder by email (rather than
//! request id) lets reconciliation find the folder from the relational
//! record alone, and a resubmission after a deleted folder reuses a clean
//! namespace.
//!
//! Folder contents:
//! - `{folder}/{id}_request.txt` - metadata manifest
//! - `{folder}/uploaded_files/{filename}` - submitted example files
//! - `{folder}/converted_files/.placeholder` - created at submission time
//! - `{folder}/converted_files/{filename}` - externally deposited output

/// Subfolder holding the submitted example files
pub const UPLOADED_DIR: &str = "uploaded_files";

/// Subfolder where the external conversion process deposits output
pub const CONVERTED_DIR: &str = "converted_files";

/// Zero-byte object that keeps the converted subfolder listable
pub const PLACEHOLDER_NAME: &str = ".placeholder";

/// Suffix of the metadata manifest object name
pub const MANIFEST_SUFFIX: &str = "_request.txt";

/// Folder name for a contact email: every character outside
/// `[A-Za-z0-9@.]` becomes `_`
pub fn folder_of(email: &str) -> String {
    email
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '@' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Key of the metadata manifest object
pub fn manifest_key(folder: &str, id: &str) -> String {
    format!("{folder}/{id}{MANIFEST_SUFFIX}")
}

/// Key of a submitted example file (original filename preserved verbatim;
/// collisions overwrite)
pub fn uploaded_key(folder: &str, filename: &str) -> String {
    format!("{folder}/{UPLOADED_DIR}/{filename}")
}

/// Key of the converted-files placeholder object
pub fn placeholder_key(folder: &str) -> String {
    format!("{folder}/{CONVERTED_DIR}/{PLACEHOLDER_NAME}")
}

/// Key of a converted output file
pub fn converted_key(folder: &str, filename: &str) -> String {
    format!("{folder}/{CONVERTED_DIR}/{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_keeps_alphanumerics_at_sign_and_dot() {
        assert_eq!(folder_of("a@b.com"), "a@b.com");
        assert_eq!(folder_of("jane.doe@example.org"), "jane.doe@example.org");
    }

    #[test]
    fn folder_replaces_everything_else() {
        assert_eq!(folder_of("jane+labels@ex-ample.com"), "jane_labels@ex_ample.com");
        assert_eq!(folder_of("weird mail@host/with\\stuff"), "weird_mail@host_with_stuff");
        assert_eq!(folder_of("üser@host.de"), "_ser@host.de");
    }

    #[test]
    fn keys_follow_the_folder_convention() {
        let folder = folder_of("a@b.com");
        assert_eq!(manifest_key(&folder, "REQ-1"), "a@b.com/REQ-1_request.txt");
        assert_eq!(uploaded_key(&folder, "f1.png"), "a@b.com/uploaded_files/f1.png");
        assert_eq!(
            placeholder_key(&folder),
            "a@b.com/converted_files/.placeholder"
        );
        assert_eq!(
            converted_key(&folder, "out.pdf"),
            "a@b.com/converted_files/out.pdf"
        );
    }

    #[test]
    fn same_email_maps_to_same_folder() {
        assert_eq!(folder_of("a@b.com"), folder_of("a@b.com"));
    }
}
