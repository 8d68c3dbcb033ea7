pub mod backward;
pub mod forward;
pub mod stream;

pub use backward::run_backward;
pub use forward::{run_forward, ForwardTrace};
pub use stream::EdgeStream;
