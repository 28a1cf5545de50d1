use fastrace::trace;
use roster_types::{
    DescribeSessionParams, DescribeSessionResult, ShutdownParams, ShutdownResult, Status,
};
use tracing::info;

use super::HandlerContext;

#[trace]
pub async fn handle_describe_session(
    ctx: &HandlerContext,
    _params: DescribeSessionParams,
) -> Result<DescribeSessionResult, Status> {
    Ok(DescribeSessionResult {
        daemon_pid: std::process::id(),
        listen_addr: ctx.listen_addr.clone(),
        user_count: ctx.users.user_count().await,
    })
}

#[trace]
pub async fn handle_shutdown(
    ctx: &HandlerContext,
    _params: ShutdownParams,
) -> Result<ShutdownResult, Status> {
    info!("Shutdown requested");
    let _ = ctx.shutdown_tx.send(());
    Ok(ShutdownResult {
        status: "shutting_down".to_string(),
    })
}
