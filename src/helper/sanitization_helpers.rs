use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::AppError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_BODY_CHARS: usize = 50_000;
pub const MAX_COMMENT_CHARS: usize = 2_000;
pub const MAX_TAG_NAME_CHARS: usize = 40;

fn code_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[\s\S]*?```").expect("code block pattern is valid"))
}

/// Escapes every HTML tag outside fenced code blocks (```), which are kept untouched.
/// Entities are decoded first so already-escaped input is not escaped twice.
pub fn sanitize_markdown_content(markdown_input: &str) -> String {
    let mut code_blocks: Vec<String> = Vec::new();

    let with_placeholders = code_block_regex().replace_all(markdown_input, |caps: &regex::Captures| {
        code_blocks.push(caps[0].to_string());
        format!("__CODE_BLOCK_PLACEHOLDER_{}__", code_blocks.len() - 1)
    });

    let decoded = html_escape::decode_html_entities(&with_placeholders);
    let mut final_output = html_escape::encode_text(&decoded).to_string();

    for (i, block) in code_blocks.iter().enumerate() {
        let placeholder = format!("__CODE_BLOCK_PLACEHOLDER_{}__", i);
        final_output = final_output.replacen(&placeholder, block, 1);
    }

    final_output
}

/// Strips all HTML tags from input (titles, names, paths).
pub fn strip_all_html(input: &str) -> String {
    ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

/// Single-line text: HTML stripped, trimmed, non-empty, bounded.
pub fn clean_line(input: &str, field: &str, max_chars: usize) -> Result<String, AppError> {
    let cleaned = strip_all_html(input.trim()).trim().to_string();
    if cleaned.is_empty() {
        return Err(AppError::Validation(format!("{} is required.", field)));
    }
    if cleaned.chars().count() > max_chars {
        return Err(AppError::Validation(format!("{} cannot exceed {} characters.", field, max_chars)));
    }
    Ok(cleaned)
}

/// Multi-line markdown text, length checked before escaping.
pub fn clean_body(input: &str, field: &str, max_chars: usize) -> Result<String, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required.", field)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::Validation(format!("{} cannot exceed {} characters.", field, max_chars)));
    }
    Ok(sanitize_markdown_content(trimmed))
}

/// Optional text; blank input becomes `None`.
pub fn clean_optional_body(input: Option<&str>, field: &str, max_chars: usize) -> Result<Option<String>, AppError> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => clean_body(text, field, max_chars).map(Some),
        None => Ok(None),
    }
}

/// Post images must point at a file stored by the upload endpoint.
pub fn clean_image_path(input: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(path) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let well_formed = path.starts_with("/media/posts/")
        && !path.contains("..")
        && path.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_'));
    if !well_formed {
        return Err(AppError::Validation("Image must be a path returned by the upload endpoint.".to_string()));
    }
    Ok(Some(path.to_string()))
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) || !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "Username must be 3 to 32 characters of letters, digits, underscores or hyphens.".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::Validation("Password must be at least 8 characters long.".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_outside_code_blocks() {
        let input = "<script>alert(1)</script>\n```\n<b>kept</b>\n```";
        let output = sanitize_markdown_content(input);
        assert!(output.starts_with("&lt;script&gt;"));
        assert!(output.contains("```\n<b>kept</b>\n```"));
    }

    #[test]
    fn does_not_double_escape() {
        assert_eq!(sanitize_markdown_content("a &lt; b"), "a &lt; b");
    }

    #[test]
    fn clean_line_strips_tags_and_checks_length() {
        assert_eq!(clean_line("  <i>Group</i> Theory ", "Title", 200).unwrap(), "Group Theory");
        assert!(matches!(clean_line("<b></b>", "Title", 200), Err(AppError::Validation(_))));
        assert!(clean_line(&"x".repeat(201), "Title", 200).is_err());
    }

    #[test]
    fn image_paths_are_restricted_to_uploads() {
        assert_eq!(
            clean_image_path(Some("/media/posts/ab/cd/file.png")).unwrap().as_deref(),
            Some("/media/posts/ab/cd/file.png")
        );
        assert_eq!(clean_image_path(Some("  ")).unwrap(), None);
        assert!(clean_image_path(Some("https://evil.example/x.png")).is_err());
        assert!(clean_image_path(Some("/media/posts/../../etc/passwd")).is_err());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("ada_lovelace").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
