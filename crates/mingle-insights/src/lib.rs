//! Database-free analytics for the dashboards: everything here works on
//! plain rows already fetched by `mingle-db`, so it can be tested in isolation.

pub mod density;
pub mod growth;
pub mod matching;
pub mod matrix;
pub mod roles;
pub mod sentiment;
pub mod topics;
