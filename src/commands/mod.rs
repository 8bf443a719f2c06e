pub mod link;
pub mod naming;
pub mod parse;
pub mod pipeline;
pub mod scan;
