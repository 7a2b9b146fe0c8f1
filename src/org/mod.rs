pub mod convert;
pub mod parser;
pub mod writer;
