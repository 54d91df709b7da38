pub mod history;
pub mod responder;

pub use history::History;
pub use responder::Responder;
