pub mod parser;
pub mod policy;
pub mod record;
