//! Services shared across clients.

mod data;

pub use data::DataService;
