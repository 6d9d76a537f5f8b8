//! Concrete units of work wired into the default pipeline graph. Each of
//! these is invoked through a task; none of them know about the graph.

pub mod images;
pub mod markup;
pub mod scripts;
pub mod styles;
