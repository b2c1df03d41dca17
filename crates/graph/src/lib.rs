//! Query stage functions for the learnflow pipeline.
//!
//! Each pipeline stage has a pure query builder in [`queries`] and a matching
//! interpreter in [`interpret`] that pulls its result out of the opaque
//! [`ResultSet`](learnflow_core::ResultSet). Identifier formatting shared by
//! all queries lives in [`sparql`].

pub mod interpret;
pub mod queries;
pub mod sparql;

pub use interpret::{LocalState, content_candidates, devices, labels, local_states};
pub use queries::QueryBuilder;
pub use sparql::{bracket, id_set};
