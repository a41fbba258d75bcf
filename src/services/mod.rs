pub mod gmail;
pub mod vision;

/// Strips anything path-like or shell-hostile out of a user- or
/// mail-provided filename before it touches the upload directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_filename("receipt-2024_03.jpg"), "receipt-2024_03.jpg");
    }

    #[test]
    fn sanitize_replaces_path_separators_and_spaces() {
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename("home depot receipt.png"), "home_depot_receipt.png");
    }

    #[test]
    fn sanitize_falls_back_on_empty_or_hostile_names() {
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("///"), "file");
    }
}
