pub mod account;
pub mod service_record;
pub mod vehicle;
