pub const LEXICON_PYCL: &str = include_str!("../templates/lexicon.pycl");
pub const CHANGES_LSC: &str = include_str!("../templates/changes.lsc");
pub const BOOK_MD: &str = include_str!("../templates/book.md");
