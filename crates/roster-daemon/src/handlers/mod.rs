use std::sync::Arc;

use roster_core::UserService;
use tokio::sync::broadcast;

mod session;
mod users;

pub use session::{handle_describe_session, handle_shutdown};
pub use users::{
    handle_add_user, handle_get_user_by_id, handle_get_users_by_ids, handle_list_users,
    handle_search_users,
};

pub struct HandlerContext {
    pub users: Arc<dyn UserService>,
    pub listen_addr: String,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl HandlerContext {
    pub fn new(
        users: Arc<dyn UserService>,
        listen_addr: String,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            users,
            listen_addr,
            shutdown_tx,
        }
    }
}
