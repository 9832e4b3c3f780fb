mod domain;
mod records;

pub use domain::*;
pub use records::*;
