//! Publish slug normalization

/// Normalize a requested slug into its published form
///
/// Lowercases, drops everything except ASCII word characters, whitespace
/// and hyphens, then turns each whitespace run into a single hyphen.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_slug(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut in_whitespace = false;

    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
                in_whitespace = true;
            }
            continue;
        }

        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
            in_whitespace = false;
        }
    }

    slug
}
