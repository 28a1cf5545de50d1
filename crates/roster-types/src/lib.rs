mod rpc;
mod status;
mod user;

pub use rpc::*;
pub use status::*;
pub use user::*;
