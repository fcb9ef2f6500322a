pub mod arg_parser;
pub mod cli;
