mod feed;
mod post;
mod social;

pub use feed::*;
pub use post::*;
pub use social::*;
