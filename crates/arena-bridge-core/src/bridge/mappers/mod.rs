//! Request/response mappers.

pub mod openai;
