//! Core record types and driver logic for the Madang bookstore.
//!
//! This crate has no I/O. It defines:
//!
//! - [`Book`], [`Customer`], [`Order`] — the stored records.
//! - [`PurchaseRow`] and [`PurchaseLookup`] — the result of looking up a
//!   customer's purchase history by name.
//! - [`parse_price`] — the only input validation the system performs.
//! - [`BookChoice`] — the book selection list with its "none" sentinel.
//! - [`SessionState`] — the lookup → select → record state machine, as a
//!   pure function of `(state, event)`.
//!
//! Storage lives in `madang-sqlite`; the `madang` binary lives in
//! `madang-cli`.
//!
//! # Example
//!
//! ```
//! use madang_core::*;
//!
//! let options = BookChoice::options(&[Book::new(10, "Economics")]);
//! let choice: BookChoice = options[1].to_string().parse().unwrap();
//!
//! let state = SessionState::default()
//!     .transition(SessionEvent::LookupCompleted { name: "Kim".into(), custid: Some(1) })
//!     .transition(SessionEvent::BookChosen(choice.bookid()));
//! assert!(state.can_record());
//!
//! let event = match parse_price("abc") {
//!     Ok(_) => unreachable!(),
//!     Err(err) => SessionEvent::PriceRejected { input: err.input },
//! };
//! assert!(matches!(state.transition(event), SessionState::InvalidPriceError { .. }));
//! ```

mod catalog;
mod price;
mod session;
mod types;

pub use catalog::{BookChoice, InvalidBookChoice, NO_BOOK_LABEL};
pub use price::{InvalidPrice, parse_price};
pub use session::{SessionEvent, SessionState};
pub use types::*;
