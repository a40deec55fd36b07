//! # billmyservices - a client for the Bill My Services counter API
//!
//! Bill My Services keeps **counters** for you: per-entity running values
//! governed by **counter types** that define their default value, bounds and
//! behavior. This crate is an immutable, thread safe, non-blocking client for
//! it, built on top of `reqwest`.
//!
//! Every request is signed: the fields of the call are concatenated into a
//! canonical string and authenticated with HMAC-SHA256 using the account's
//! secret key (see [`signer`]). Every response is reduced to an [`Outcome`],
//! either `Success(value)` or `Failure(message)`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use billmyservices::{Client, CounterType, CounterVersion};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), billmyservices::Error> {
//!     // Reads BILLMYSERVICES_USERID and BILLMYSERVICES_SECRETKEY
//!     let client = Client::from_env()?;
//!
//!     // Between -5 and 5, starting at 0
//!     let credits = CounterType::new("credits", "Prepaid credits", 0, -5, 5, CounterVersion::AbsoluteCounter);
//!     let added = client.add_counter_type(&credits)?.await;
//!     assert!(added.is_success(), "{added:?}");
//!
//!     // Operations return immediately; await the outcome when you need it
//!     let pending = client.post_counter("credits", "customer-42", 3)?;
//!     let posted = pending.await;
//!     println!("posted: {}", posted.is_success());
//!
//!     let counter = client
//!         .read_counter("credits", "customer-42")?
//!         .await
//!         .guard(|c| c.value() == 3, "the counter should be 3");
//!     match counter.failure_message() {
//!         None => println!("counter is 3"),
//!         Some(reason) => eprintln!("{reason}"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Errors and outcomes
//!
//! There are two channels, and they never mix:
//!
//! - [`Error`] is returned synchronously, before anything is sent: missing or
//!   invalid configuration when building a client, illegal parameters when
//!   calling an operation. These are programming or deployment mistakes.
//! - [`Outcome::Failure`] is what an awaited operation resolves to when the
//!   service did not answer as expected: network errors, unexpected statuses
//!   (with the status and body in the message), undecodable bodies. A counter
//!   post rejected by the service because it would break the counter's bounds
//!   is a failure too; only its message tells it apart from other failures.
//!
//! ```no_run
//! # async fn example(client: billmyservices::Client) -> Result<(), billmyservices::Error> {
//! let outcome = client.post_counter("credits", "customer-42", 100)?.await;
//! if outcome.is_failure() {
//!     // e.g. "expected HTTP 200 but 409, response was `...`"
//!     eprintln!("{}", outcome.message());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom transports
//!
//! Requests go through a [`Transport`]. The default is [`ReqwestTransport`];
//! provide your own with [`ClientBuilder::build_with_transport`].

mod client;
pub mod config;
mod error;
pub mod model;
mod outcome;
pub mod request;
pub mod response;
pub mod signer;
mod transport;

pub use client::{default_client, install_default, Client, ClientBuilder};
pub use config::Config;
pub use error::{Error, Result};
pub use model::{Counter, CounterType, CounterTypeAndCounters, CounterVersion};
pub use outcome::Outcome;
pub use request::Credentials;
pub use transport::{ReqwestTransport, Transport};
