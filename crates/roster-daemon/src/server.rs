use fastrace::trace;
use std::sync::Arc;

use fastrace::prelude::*;
use roster_config::{get_daemon_record_path, Config, DaemonRecord};
use roster_core::UserService;
use roster_types::*;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::handlers::{
    handle_add_user, handle_describe_session, handle_get_user_by_id, handle_get_users_by_ids,
    handle_list_users, handle_search_users, handle_shutdown, HandlerContext,
};
use crate::profiling::RequestProfiler;

pub struct DaemonServer {
    users: Arc<dyn UserService>,
    listen_addr: String,
    shutdown_tx: broadcast::Sender<()>,
}

impl DaemonServer {
    pub fn new(config: &Config, users: Arc<dyn UserService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            users,
            listen_addr: config.daemon.listen_addr.clone(),
            shutdown_tx,
        }
    }

    #[trace]
    pub async fn run(self) -> anyhow::Result<()> {
        let record_path = get_daemon_record_path();

        let listener = TcpListener::bind(&self.listen_addr).await?;
        DaemonRecord::for_current_process(listener.local_addr()?.to_string())
            .write(&record_path)?;

        let result = self.serve(listener).await;
        DaemonRecord::remove(&record_path);
        result
    }

    pub async fn serve(mut self, listener: TcpListener) -> anyhow::Result<()> {
        self.listen_addr = listener.local_addr()?.to_string();
        info!("Daemon started, listening on {}", self.listen_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let server = Arc::new(self);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let server = Arc::clone(&server);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_client(stream).await {
                                    error!("Error handling client {}: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, shutting down");
                    break;
                }
            }
        }

        info!("Shutting down daemon");
        Ok(())
    }

    fn context(&self) -> HandlerContext {
        HandlerContext::new(
            Arc::clone(&self.users),
            self.listen_addr.clone(),
            self.shutdown_tx.clone(),
        )
    }

    #[trace]
    async fn handle_client(&self, mut stream: TcpStream) -> anyhow::Result<()> {
        let start = std::time::Instant::now();
        let mut data = Vec::new();
        stream.read_to_end(&mut data).await?;

        if data.is_empty() {
            return Ok(());
        }

        let response = match serde_json::from_slice::<Value>(&data) {
            Ok(request) => {
                let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
                let params = request.get("params").cloned().unwrap_or(json!({}));
                let profile = request
                    .get("profile")
                    .and_then(|p| p.as_bool())
                    .unwrap_or(false);

                let ctx = self.context();
                let response = if profile {
                    self.dispatch_with_profiling(&ctx, method, params).await
                } else {
                    self.dispatch(&ctx, method, params).await
                };
                info!("{} completed in {:?}", method, start.elapsed());
                response
            }
            Err(e) => {
                warn!("Rejecting malformed request: {}", e);
                encode(RpcResponse::<()>::error(Status::invalid_argument(format!(
                    "Invalid request: {}",
                    e
                ))))
            }
        };

        stream
            .write_all(serde_json::to_vec(&response)?.as_slice())
            .await?;
        stream.shutdown().await?;

        Ok(())
    }

    async fn dispatch_with_profiling(
        &self,
        ctx: &HandlerContext,
        method: &str,
        params: Value,
    ) -> Value {
        let profiler = RequestProfiler::install();
        let root = Span::root(method.to_string(), SpanContext::random());

        let mut response = self.dispatch(ctx, method, params).in_span(root).await;

        let profiling = profiler.finish(method);
        if let Some(obj) = response.as_object_mut() {
            if obj.contains_key("result") {
                if let Ok(value) = serde_json::to_value(&profiling) {
                    obj.insert("profiling".to_string(), value);
                }
            }
        }

        response
    }

    #[trace]
    async fn dispatch(&self, ctx: &HandlerContext, method: &str, params: Value) -> Value {
        macro_rules! handle {
            ($params_ty:ty, $handler:expr) => {{
                match serde_json::from_value::<$params_ty>(params) {
                    Ok(p) => match $handler(ctx, p).await {
                        Ok(result) => encode(RpcResponse::success(result)),
                        Err(status) => encode(RpcResponse::<()>::error(status)),
                    },
                    Err(e) => encode(RpcResponse::<()>::error(Status::invalid_argument(
                        format!("Invalid params: {}", e),
                    ))),
                }
            }};
        }

        match method {
            METHOD_ADD_USER => handle!(User, handle_add_user),
            METHOD_GET_USER_BY_ID => handle!(UserIdRequest, handle_get_user_by_id),
            METHOD_GET_USERS_BY_IDS => handle!(UserIdsRequest, handle_get_users_by_ids),
            METHOD_SEARCH_USERS => handle!(SearchRequest, handle_search_users),
            METHOD_LIST_USERS => handle!(ListUsersRequest, handle_list_users),
            METHOD_DESCRIBE_SESSION => handle!(DescribeSessionParams, handle_describe_session),
            METHOD_SHUTDOWN => handle!(ShutdownParams, handle_shutdown),
            _ => encode(RpcResponse::<()>::error(Status::unimplemented(format!(
                "Unknown method: {}",
                method
            )))),
        }
    }
}

/// Turns a response into its wire value. A result that cannot be encoded is
/// reported to the caller as an internal error.
fn encode<R: Serialize>(response: RpcResponse<R>) -> Value {
    match serde_json::to_value(&response) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to encode response: {}", e);
            let status = Status::internal(format!("Failed to encode response: {}", e));
            json!({ "error": { "code": status.code.as_str(), "message": status.message } })
        }
    }
}

#[cfg(test)]
mod tests {
    use roster_core::{builtin_users, InMemoryUserRepository, UserServiceImpl};

    use super::*;

    fn server() -> DaemonServer {
        let repo = InMemoryUserRepository::with_users(builtin_users());
        DaemonServer::new(&Config::default(), Arc::new(UserServiceImpl::new(repo)))
    }

    #[tokio::test]
    async fn test_dispatch_add_then_get() {
        let server = server();
        let ctx = server.context();

        let added = server
            .dispatch(
                &ctx,
                METHOD_ADD_USER,
                json!({"id": 3, "fname": "Bob", "city": "Chicago", "phone": 5555555555i64, "height": 175.0, "married": true}),
            )
            .await;
        assert_eq!(added["result"]["user"]["fname"], "Bob");

        let fetched = server
            .dispatch(&ctx, METHOD_GET_USER_BY_ID, json!({"id": 3}))
            .await;
        assert_eq!(fetched["result"], added["result"]);
    }

    #[tokio::test]
    async fn test_dispatch_error_codes() {
        let server = server();
        let ctx = server.context();

        let duplicate = server
            .dispatch(
                &ctx,
                METHOD_ADD_USER,
                json!({"id": 1, "fname": "Jane", "city": "Los Angeles", "phone": 1, "height": 160.0}),
            )
            .await;
        assert_eq!(duplicate["error"]["code"], "already_exists");
        assert_eq!(duplicate["error"]["message"], "user with this Id already exists");

        let missing_city = server
            .dispatch(
                &ctx,
                METHOD_ADD_USER,
                json!({"id": 9, "fname": "Jane", "phone": 1, "height": 160.0}),
            )
            .await;
        assert_eq!(missing_city["error"]["code"], "invalid_argument");
        assert_eq!(missing_city["error"]["message"], "invalid city input");

        let empty_search = server.dispatch(&ctx, METHOD_SEARCH_USERS, json!({})).await;
        assert_eq!(empty_search["error"]["code"], "invalid_argument");

        let not_found = server
            .dispatch(&ctx, METHOD_GET_USER_BY_ID, json!({"id": 404}))
            .await;
        assert_eq!(not_found["error"]["code"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_dispatch_bad_params_and_unknown_method() {
        let server = server();
        let ctx = server.context();

        let bad = server
            .dispatch(&ctx, METHOD_GET_USER_BY_ID, json!({"id": "one"}))
            .await;
        assert_eq!(bad["error"]["code"], "invalid_argument");
        assert!(bad["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid params:"));

        let unknown = server.dispatch(&ctx, "delete-user", json!({})).await;
        assert_eq!(unknown["error"]["code"], "unimplemented");
    }

    #[tokio::test]
    async fn test_dispatch_best_effort_methods() {
        let server = server();
        let ctx = server.context();

        let many = server
            .dispatch(&ctx, METHOD_GET_USERS_BY_IDS, json!({"ids": [2, 999, 1]}))
            .await;
        let ids: Vec<i64> = many["result"]["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 1]);

        let page = server
            .dispatch(&ctx, METHOD_LIST_USERS, json!({"page": 1, "page_size": 1}))
            .await;
        assert_eq!(page["result"]["users"][0]["fname"], "Jane");

        let unmarried = server
            .dispatch(
                &ctx,
                METHOD_SEARCH_USERS,
                json!({"married": false, "search_married_flag": true}),
            )
            .await;
        assert_eq!(unmarried["result"]["users"].as_array().unwrap().len(), 1);
        assert_eq!(unmarried["result"]["users"][0]["id"], 2);

        let session = server
            .dispatch(&ctx, METHOD_DESCRIBE_SESSION, json!({}))
            .await;
        assert_eq!(session["result"]["user_count"], 2);
    }

    async fn send_raw(addr: std::net::SocketAddr, body: &[u8]) -> Value {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut read_half, mut write_half) = stream.into_split();
        write_half.write_all(body).await.unwrap();
        write_half.shutdown().await.unwrap();

        let mut data = Vec::new();
        read_half.read_to_end(&mut data).await.unwrap();
        serde_json::from_slice(&data).unwrap()
    }

    async fn call(addr: std::net::SocketAddr, request: Value) -> Value {
        send_raw(addr, &serde_json::to_vec(&request).unwrap()).await
    }

    #[tokio::test]
    async fn test_serve_over_tcp_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(server().serve(listener));

        let response = call(
            addr,
            json!({"method": METHOD_SEARCH_USERS, "params": {"city": "New York"}}),
        )
        .await;
        let users: UsersResponse = serde_json::from_value(response["result"].clone()).unwrap();
        assert_eq!(users.users.len(), 1);
        assert_eq!(users.users[0].fname, "John");

        let session = call(addr, json!({"method": METHOD_DESCRIBE_SESSION, "params": {}})).await;
        assert_eq!(session["result"]["listen_addr"], addr.to_string());

        let stopped = call(addr, json!({"method": METHOD_SHUTDOWN, "params": {}})).await;
        assert_eq!(stopped["result"]["status"], "shutting_down");

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_profiled_request_carries_stats() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(server().serve(listener));

        let response = call(
            addr,
            json!({"method": METHOD_LIST_USERS, "params": {}, "profile": true}),
        )
        .await;
        assert_eq!(response["result"]["users"].as_array().unwrap().len(), 2);
        assert_eq!(response["profiling"]["method"], METHOD_LIST_USERS);
        assert!(response["profiling"]["functions"].is_array());

        call(addr, json!({"method": METHOD_SHUTDOWN, "params": {}})).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_body_gets_invalid_argument_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(server().serve(listener));

        let response = send_raw(addr, b"{not json").await;
        let decoded: RpcResponse<Value> = serde_json::from_value(response).unwrap();
        let status = decoded.into_result().unwrap_err();
        assert_eq!(status.code, StatusCode::InvalidArgument);
        assert!(status.message.starts_with("Invalid request:"));

        // the daemon keeps serving afterwards
        let listed = call(addr, json!({"method": METHOD_LIST_USERS, "params": {}})).await;
        assert_eq!(listed["result"]["users"].as_array().unwrap().len(), 2);

        call(addr, json!({"method": METHOD_SHUTDOWN, "params": {}})).await;
        handle.await.unwrap().unwrap();
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("unsupported value"))
        }
    }

    #[test]
    fn test_unencodable_result_is_internal_error() {
        let value = encode(RpcResponse::success(Unencodable));
        assert_eq!(value["error"]["code"], "internal");
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("unsupported value"));

        let ok = encode(RpcResponse::success(ShutdownResult {
            status: "shutting_down".to_string(),
        }));
        assert_eq!(ok, json!({"result": {"status": "shutting_down"}}));
    }
}
