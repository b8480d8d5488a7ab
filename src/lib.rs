//! daymark — recurring and relocatable checkbox tasks in date-keyed
//! markdown notes.
//!
//! The library is split the same way the data flows: `parse` turns raw
//! lines into [`model::task::Task`] values and back, `model::repeat`
//! computes next occurrences, `store` abstracts note storage behind the
//! [`store::NoteStore`] trait, and `ops` hosts the relocation engine and
//! the focus-scan controller that drive cross-note mutations.

pub mod cli;
pub mod model;
pub mod ops;
pub mod parse;
pub mod prompt;
pub mod store;
