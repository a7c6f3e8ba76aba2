//! Driver-facing session state machine.
//!
//! Models the lookup → choose book → record flow as a pure function of
//! `(state, event)`. Rendering layers hold a [`SessionState`], feed it the
//! outcome of each workflow call as a [`SessionEvent`], and draw whatever
//! the new state says.
//!
//! ```text
//! NoCustomerSelected --lookup hit--> CustomerSelected --book--> BookSelected
//!        ^                                  ^   |                   |
//!        +----------lookup miss-------------+   +<--none sentinel---+
//!                                                                   |
//!            BookSelected --recorded--> TransactionRecorded --ack--+
//!            BookSelected --bad price-> InvalidPriceError  --ack--+
//! ```
//!
//! # Examples
//!
//! ```
//! use madang_core::{SessionEvent, SessionState};
//!
//! let state = SessionState::default()
//!     .transition(SessionEvent::LookupCompleted { name: "Kim".into(), custid: Some(1) })
//!     .transition(SessionEvent::BookChosen(Some(10)))
//!     .transition(SessionEvent::PurchaseRecorded { orderid: 101 });
//!
//! assert!(matches!(state, SessionState::TransactionRecorded { orderid: 101, .. }));
//! assert!(state.can_record());
//! ```

use serde::Serialize;

/// Where the driver is in the lookup/record flow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No successful lookup yet; recording is unavailable.
    #[default]
    NoCustomerSelected,
    /// A lookup returned purchases; `custid` is the first row's customer.
    CustomerSelected { custid: i64, name: String },
    /// A concrete book is selected; a price may be submitted.
    BookSelected {
        custid: i64,
        name: String,
        bookid: i64,
    },
    /// The last submission was committed as `orderid`.
    TransactionRecorded {
        custid: i64,
        name: String,
        bookid: i64,
        orderid: i64,
    },
    /// The last submission was rejected because `input` is not a price.
    InvalidPriceError {
        custid: i64,
        name: String,
        bookid: i64,
        input: String,
    },
}

/// Outcomes reported to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A lookup by `name` finished; `custid` is absent when nothing matched.
    LookupCompleted { name: String, custid: Option<i64> },
    /// A book option was picked; `None` is the sentinel.
    BookChosen(Option<i64>),
    /// A purchase was committed.
    PurchaseRecorded { orderid: i64 },
    /// A price input failed to parse.
    PriceRejected { input: String },
    /// The last recording outcome was shown; go back to entry.
    Acknowledged,
}

impl SessionState {
    /// Applies an event and returns the next state.
    ///
    /// Events that make no sense in the current state (choosing a book
    /// before any customer, recording without a book) leave it unchanged.
    pub fn transition(self, event: SessionEvent) -> SessionState {
        match event {
            SessionEvent::LookupCompleted { name, custid } => match custid {
                Some(custid) => SessionState::CustomerSelected { custid, name },
                None => SessionState::NoCustomerSelected,
            },
            SessionEvent::BookChosen(choice) => match (self.owned_customer(), choice) {
                (Some((custid, name)), Some(bookid)) => SessionState::BookSelected {
                    custid,
                    name,
                    bookid,
                },
                (Some((custid, name)), None) => SessionState::CustomerSelected { custid, name },
                (None, _) => self,
            },
            SessionEvent::PurchaseRecorded { orderid } => match self.owned_selection() {
                Some((custid, name, bookid)) => SessionState::TransactionRecorded {
                    custid,
                    name,
                    bookid,
                    orderid,
                },
                None => self,
            },
            SessionEvent::PriceRejected { input } => match self.owned_selection() {
                Some((custid, name, bookid)) => SessionState::InvalidPriceError {
                    custid,
                    name,
                    bookid,
                    input,
                },
                None => self,
            },
            SessionEvent::Acknowledged => match self {
                SessionState::TransactionRecorded {
                    custid,
                    name,
                    bookid,
                    ..
                }
                | SessionState::InvalidPriceError {
                    custid,
                    name,
                    bookid,
                    ..
                } => SessionState::BookSelected {
                    custid,
                    name,
                    bookid,
                },
                other => other,
            },
        }
    }

    /// The selected customer, if any.
    pub fn customer(&self) -> Option<(i64, &str)> {
        match self {
            SessionState::NoCustomerSelected => None,
            SessionState::CustomerSelected { custid, name }
            | SessionState::BookSelected { custid, name, .. }
            | SessionState::TransactionRecorded { custid, name, .. }
            | SessionState::InvalidPriceError { custid, name, .. } => Some((*custid, name)),
        }
    }

    /// The selected customer and book, if a book is selected.
    ///
    /// The two outcome states keep the selection so further entries can
    /// be recorded without re-selecting.
    pub fn selection(&self) -> Option<(i64, &str, i64)> {
        match self {
            SessionState::BookSelected {
                custid,
                name,
                bookid,
            }
            | SessionState::TransactionRecorded {
                custid,
                name,
                bookid,
                ..
            }
            | SessionState::InvalidPriceError {
                custid,
                name,
                bookid,
                ..
            } => Some((*custid, name, *bookid)),
            _ => None,
        }
    }

    fn owned_customer(&self) -> Option<(i64, String)> {
        self.customer().map(|(custid, name)| (custid, name.to_string()))
    }

    fn owned_selection(&self) -> Option<(i64, String, i64)> {
        self.selection()
            .map(|(custid, name, bookid)| (custid, name.to_string(), bookid))
    }

    /// Returns `true` if a price may be submitted.
    pub fn can_record(&self) -> bool {
        self.selection().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looked_up() -> SessionState {
        SessionState::default().transition(SessionEvent::LookupCompleted {
            name: "Kim".to_string(),
            custid: Some(1),
        })
    }

    #[test]
    fn test_lookup_hit_selects_customer() {
        assert_eq!(
            looked_up(),
            SessionState::CustomerSelected {
                custid: 1,
                name: "Kim".to_string()
            }
        );
    }

    #[test]
    fn test_lookup_miss_clears_selection() {
        let state = looked_up()
            .transition(SessionEvent::BookChosen(Some(10)))
            .transition(SessionEvent::LookupCompleted {
                name: "Nobody".to_string(),
                custid: None,
            });
        assert_eq!(state, SessionState::NoCustomerSelected);
        assert!(!state.can_record());
    }

    #[test]
    fn test_book_before_customer_is_ignored() {
        let state = SessionState::default().transition(SessionEvent::BookChosen(Some(10)));
        assert_eq!(state, SessionState::NoCustomerSelected);
    }

    #[test]
    fn test_sentinel_returns_to_customer_selected() {
        let state = looked_up()
            .transition(SessionEvent::BookChosen(Some(10)))
            .transition(SessionEvent::BookChosen(None));
        assert_eq!(state, looked_up());
    }

    #[test]
    fn test_record_without_book_is_ignored() {
        let state = looked_up().transition(SessionEvent::PurchaseRecorded { orderid: 5 });
        assert_eq!(state, looked_up());
    }

    #[test]
    fn test_invalid_price_is_recoverable() {
        let state = looked_up()
            .transition(SessionEvent::BookChosen(Some(10)))
            .transition(SessionEvent::PriceRejected {
                input: "abc".to_string(),
            });
        assert!(matches!(state, SessionState::InvalidPriceError { ref input, .. } if input == "abc"));
        assert!(state.can_record());

        let state = state.transition(SessionEvent::PurchaseRecorded { orderid: 101 });
        assert!(matches!(
            state,
            SessionState::TransactionRecorded {
                orderid: 101,
                bookid: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_acknowledge_returns_to_book_selected() {
        let state = looked_up()
            .transition(SessionEvent::BookChosen(Some(10)))
            .transition(SessionEvent::PurchaseRecorded { orderid: 101 })
            .transition(SessionEvent::Acknowledged);
        assert_eq!(
            state,
            SessionState::BookSelected {
                custid: 1,
                name: "Kim".to_string(),
                bookid: 10
            }
        );
        assert_eq!(state.clone().transition(SessionEvent::Acknowledged), state);
    }

    #[test]
    fn test_serializes_with_state_tag() {
        let json = serde_json::to_value(looked_up()).unwrap();
        assert_eq!(json["state"], "customer_selected");
        assert_eq!(json["custid"], 1);
    }
}
