pub mod git;
pub mod perforce;
pub mod repos;

pub use git::*;
pub use perforce::*;
pub use repos::*;
