//! Documentation review file: README and CHANGELOG links of every library
//! pinned on the release candidate, for a human to read through before
//! tagging.

use std::path::Path;

use crate::checks::LibraryDocs;
use crate::error::Result;

/// Render the review as Markdown, one section per library.
pub fn render_docs_review(libraries: &[LibraryDocs]) -> String {
    let mut out = String::new();
    out.push_str("# Documentation Review\n\n");

    if libraries.is_empty() {
        out.push_str("No library submodules were resolved on the release candidate.\n");
        return out;
    }

    out.push_str(&format!(
        "Review the README and CHANGELOG of each of the {} libraries below.\n\n",
        libraries.len()
    ));
    for lib in libraries {
        out.push_str(&format!("## {}\n\n", lib.repo));
        out.push_str(&format!("- commit: `{}`\n", lib.commit));
        out.push_str(&format!("- [README.md]({})\n", lib.readme_url));
        out.push_str(&format!("- [CHANGELOG.md]({})\n\n", lib.changelog_url));
    }
    out
}

/// Write the rendered review to `path`, replacing any previous file.
pub fn write_docs_review(path: &Path, libraries: &[LibraryDocs]) -> Result<()> {
    std::fs::write(path, render_docs_review(libraries))?;
    Ok(())
}
