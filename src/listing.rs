//! §4.G — the directory lister. Scans a directory, sorts directories first
//! then lexicographically, skips dotfiles, and renders an HTML index.
//!
//! Grounded on the teacher's `discover_files_recursive` (original
//! `src/main.rs`) for the `read_dir` + `metadata` walk, retargeted at
//! on-demand rendering (one directory, not a recursive startup crawl).

use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    is_dir: bool,
    name: String,
    suffix: char,
}

/// Builds the sorted entry list for `dir`: directories first (`DT_DIR`
/// ahead of everything else), then lexicographic by name; entries whose
/// name begins with `.` are skipped.
pub async fn list_entries(dir: &Path) -> std::io::Result<Vec<(String, char)>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type().await?;
        let is_dir = file_type.is_dir();
        let suffix = entry_suffix(&file_type);
        entries.push(Entry {
            is_dir,
            name,
            suffix,
        });
    }

    // Directories before non-directories, then lexicographic by name; `Ord`
    // on `bool` puts `false` before `true`, so sort on `!is_dir` to put
    // directories (is_dir = true) first.
    entries.sort_by(|a, b| (!a.is_dir, &a.name).cmp(&(!b.is_dir, &b.name)));

    Ok(entries
        .into_iter()
        .map(|e| (e.name, e.suffix))
        .collect())
}

#[cfg(unix)]
fn entry_suffix(file_type: &std::fs::FileType) -> char {
    use std::os::unix::fs::FileTypeExt;
    if file_type.is_dir() {
        '/'
    } else if file_type.is_fifo() {
        '|'
    } else if file_type.is_symlink() {
        '@'
    } else if file_type.is_socket() {
        '='
    } else {
        '\0'
    }
}

#[cfg(not(unix))]
fn entry_suffix(file_type: &std::fs::FileType) -> char {
    if file_type.is_dir() {
        '/'
    } else if file_type.is_symlink() {
        '@'
    } else {
        '\0'
    }
}

/// Renders the HTML document for `spec.md` §4.G. `display_name` is the
/// request path shown in the `<title>`. Entry names are not percent-encoded
/// in hrefs (Open Question 1 — see `DESIGN.md`); `<`, `>`, `&`, `"` are
/// HTML-escaped so a crafted filename can't break the surrounding markup.
pub fn render(display_name: &str, entries: &[(String, char)]) -> String {
    let mut html = String::new();
    html.push_str("<head><title>Index of ");
    html.push_str(&html_escape(display_name));
    html.push_str("</title></head><body>\n");
    html.push_str("<a href=\"..\">..</a><br>\n");
    for (name, suffix) in entries {
        let href = html_escape(name);
        let label = if *suffix == '\0' {
            html_escape(name)
        } else {
            format!("{}{}", html_escape(name), suffix)
        };
        html.push_str(&format!("<a href=\"{href}\">{label}</a><br>\n"));
    }
    html.push_str("</body>\n");
    html
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sorts_directories_before_files_then_lexicographically() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("dirB")).unwrap();
        fs::write(dir.path().join("a.txt"), b"x").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();

        let entries = list_entries(dir.path()).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["dirB", "a.txt"]);
    }

    #[test]
    fn render_includes_parent_link_first_and_directory_suffix() {
        let html = render("/", &[("dirB".to_string(), '/'), ("a.txt".to_string(), '\0')]);
        let parent_pos = html.find("href=\"..\"").unwrap();
        let dirb_pos = html.find("dirB/").unwrap();
        let a_pos = html.find("a.txt</a>").unwrap();
        assert!(parent_pos < dirb_pos);
        assert!(dirb_pos < a_pos);
    }

    #[test]
    fn render_escapes_html_special_characters_in_names() {
        let html = render("/", &[("<script>".to_string(), '\0')]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
