use mkt_derive::mkt_error;
use std::borrow::Cow;

#[mkt_error]
pub enum ArchiveError {
    #[error("Archive IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Rejected entry{}: {path}", format_context(.context))]
    Rejected { path: String, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn open() -> Result<(), ArchiveError> {
    let res: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
    res.context("opening archive")?;
    Ok(())
}

fn main() {
    let err = open().unwrap_err();
    assert_eq!(err.to_string(), "Archive IO error (opening archive): boom");

    let internal: ArchiveError = "broken".into();
    assert_eq!(internal.to_string(), "Internal error: broken");

    let tagged: Result<(), ArchiveError> =
        Err(ArchiveError::Rejected { path: "../x".to_owned(), context: None });
    let tagged = tagged.context("plugin.zip").unwrap_err();
    assert_eq!(tagged.to_string(), "Rejected entry (plugin.zip): ../x");
}
