//! cnmkt-events
//!
//! Labels dates that fall inside curated market "special event" windows.
//!
//! The event table is static configuration: loaded once, never mutated.
//! Windows may overlap; a date always gets the FIRST matching event in
//! table order, for both the single-date and the bulk query.

mod index;
mod table;

pub use index::EventIndex;
pub use table::{EventTable, SpecialEvent};
