use anyhow::{anyhow, Result};
use std::fs::File;
use std::path::Path;

pub fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

/// Escapes `&`, `<`, `>` and `"` so `s` can be dropped into HTML text,
/// attribute values, or XML character data.
pub fn escape_html(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    // Writing into a `Vec` can't fail.
    let _ = comrak::html::escape(&mut out, s.as_bytes());
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;",
            escape_html(r#"<b>Tom & "Jerry"</b>"#),
        );
    }

    #[test]
    fn test_escape_html_plain() {
        assert_eq!("Getting Started", escape_html("Getting Started"));
    }
}
