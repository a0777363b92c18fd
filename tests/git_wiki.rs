use anyhow::{anyhow, Result};
use std::path::Path;
use std::process::Command;
use url::Url;
use wikistatic::wiki::{GitWiki, HistoryQuery, PageStore};

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(repository: &Path, args: &[&str], author: Option<(&str, &str)>) -> Result<()> {
    let mut command = Command::new("git");
    command
        .arg("-C")
        .arg(repository)
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=master"])
        .args(args)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_COMMITTER_NAME", "Wiki")
        .env("GIT_COMMITTER_EMAIL", "wiki@acme.example");
    if let Some((name, date)) = author {
        command
            .env("GIT_AUTHOR_NAME", name)
            .env("GIT_AUTHOR_EMAIL", "author@acme.example")
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date);
    }
    let output = command.output()?;
    match output.status.success() {
        true => Ok(()),
        false => Err(anyhow!(
            "git {}: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        )),
    }
}

/// Creates a wiki with a `Home` page, a footer and a page that was renamed
/// from `Old-Name` to `New-Name` by a different author.
fn renamed_page_wiki(dir: &Path) -> Result<()> {
    git(dir, &["init", "-q"], None)?;
    std::fs::write(dir.join("Home.md"), "Welcome. See [[New Name]].\n")?;
    std::fs::write(dir.join("Old-Name.md"), "Some text.\n")?;
    std::fs::write(dir.join("_Footer.md"), "Back to [[Home]].\n")?;
    std::fs::write(dir.join("Notes.org"), "* Notes\n")?;
    git(dir, &["add", "."], None)?;
    git(
        dir,
        &["commit", "-q", "-m", "Create pages"],
        Some(("Alice", "@1673740800 +0000")),
    )?;
    git(dir, &["mv", "Old-Name.md", "New-Name.md"], None)?;
    git(
        dir,
        &["commit", "-q", "-m", "Rename page"],
        Some(("Bob", "@1714521600 +0000")),
    )?;
    Ok(())
}

#[test]
fn test_git_wiki() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    renamed_page_wiki(dir.path())?;
    let wiki = GitWiki::open(dir.path(), &Url::parse("https://wiki.acme.example/")?)?;

    let pages = wiki.pages()?;
    let slugs: Vec<&str> = pages.iter().map(|page| page.slug.as_str()).collect();
    assert_eq!(vec!["Home", "New-Name", "Notes"], slugs);
    assert_eq!(
        "<p>Welcome. See <a class=\"internal present\" href=\"https://wiki.acme.example/New-Name.md\">New Name</a>.</p>\n",
        pages[0].formatted_data
    );
    assert_eq!("", pages[2].formatted_data);

    let history = wiki.versions(&pages[1], &HistoryQuery::full())?;
    assert_eq!(2, history.len());
    assert_eq!("Bob", history[0].author_name);
    assert_eq!("Alice", history[1].author_name);
    assert_eq!("2023-01-15T00:00:00+00:00", history[1].authored_date.to_rfc3339());

    let without_renames = HistoryQuery {
        follow_renames: false,
        limit: HistoryQuery::FULL_HISTORY_LIMIT,
    };
    assert_eq!(1, wiki.versions(&pages[1], &without_renames)?.len());

    let footer = match wiki.footer()? {
        Some(footer) => footer,
        None => return Err(anyhow!("footer not found")),
    };
    assert_eq!(
        "<p>Back to <a class=\"internal present\" href=\"https://wiki.acme.example/Home.md\">Home</a>.</p>\n",
        footer.formatted_data
    );
    Ok(())
}

#[test]
fn test_open_not_a_repository() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    assert!(GitWiki::open(dir.path(), &Url::parse("https://wiki.acme.example/")?).is_err());
    Ok(())
}
