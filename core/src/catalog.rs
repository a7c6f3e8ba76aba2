//! Book selection options.
//!
//! The driver offers a list headed by a "nothing selected" sentinel followed
//! by one `"{bookid},{bookname}"` entry per book. [`BookChoice`] renders and
//! parses those labels.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::Book;

/// Label of the sentinel option that selects no book.
pub const NO_BOOK_LABEL: &str = "none";

/// A selection made from the book options list.
///
/// # Examples
///
/// ```
/// use madang_core::{Book, BookChoice};
///
/// let options = BookChoice::options(&[Book::new(1, "Football History")]);
/// assert_eq!(options[0], BookChoice::Nothing);
/// assert_eq!(options[1].to_string(), "1,Football History");
///
/// let parsed: BookChoice = "1,Football History".parse().unwrap();
/// assert_eq!(parsed.bookid(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookChoice {
    /// The sentinel: no book chosen.
    Nothing,
    /// A concrete book.
    Book { bookid: i64, bookname: String },
}

impl BookChoice {
    /// Builds the option list: the sentinel first, then books in the given order.
    pub fn options(books: &[Book]) -> Vec<BookChoice> {
        std::iter::once(BookChoice::Nothing)
            .chain(books.iter().map(BookChoice::from))
            .collect()
    }

    /// Returns the chosen book id, or `None` for the sentinel.
    pub fn bookid(&self) -> Option<i64> {
        match self {
            BookChoice::Nothing => None,
            BookChoice::Book { bookid, .. } => Some(*bookid),
        }
    }
}

impl From<&Book> for BookChoice {
    fn from(book: &Book) -> Self {
        BookChoice::Book {
            bookid: book.bookid,
            bookname: book.bookname.clone(),
        }
    }
}

impl fmt::Display for BookChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookChoice::Nothing => f.write_str(NO_BOOK_LABEL),
            BookChoice::Book { bookid, bookname } => write!(f, "{bookid},{bookname}"),
        }
    }
}

/// A book option label that is neither the sentinel nor `"{id}[,{name}]"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid book selection '{0}': expected '{NO_BOOK_LABEL}' or '<bookid>,<bookname>'")]
pub struct InvalidBookChoice(pub String);

impl FromStr for BookChoice {
    type Err = InvalidBookChoice;

    /// Accepts the sentinel, a full `"{id},{name}"` label, or a bare id.
    /// Only the text before the first comma is the id, so titles may
    /// contain commas.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label == NO_BOOK_LABEL {
            return Ok(BookChoice::Nothing);
        }

        let (id, name) = label.split_once(',').unwrap_or((label, ""));
        let bookid = id
            .trim()
            .parse::<i64>()
            .map_err(|_| InvalidBookChoice(s.to_string()))?;

        Ok(BookChoice::Book {
            bookid,
            bookname: name.to_string(),
        })
    }
}
