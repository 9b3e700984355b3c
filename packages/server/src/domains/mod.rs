pub mod batch;
pub mod companies;
