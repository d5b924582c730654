//! SQL fragment rewriting for sqlcache.
//!
//! This crate expands the small template language embedded in registered
//! query text before parameters are bound:
//!
//! - `$if(property){fragment}` conditional predicates
//! - `:name[]` variable-length IN-lists
//! - `$sort(property){(id clause)...(default clause)}` ORDER BY switches
//!
//! It is not an SQL parser; everything outside these constructs is copied
//! through untouched.

pub mod condition;
pub mod conditional;
pub mod error;
pub mod in_list;
pub mod order_by;
pub mod rewriter;

pub use condition::{Conditions, FnConditions, Record, from_fn};
pub use conditional::{conditional_properties, is_enabled};
pub use error::RewriteError;
pub use order_by::{SortCase, SortSwitch, selector_properties};
pub use rewriter::{RewriteConfig, Rewriter};
