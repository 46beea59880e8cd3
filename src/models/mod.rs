mod project;
mod revision;
pub mod series;

pub use project::{InitialValues, NewProject, Project, MAX_AMOUNT};
pub(crate) use project::{ensure_amount_in_range, validate_initial_values};
pub use revision::{NewRevision, Revision, DATE_FORMAT};
pub use series::{cumulative_series, SeriesPoint};

#[cfg(test)]
mod tests;
