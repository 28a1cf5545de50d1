use fastrace::trace;
use roster_types::{
    ListUsersRequest, SearchRequest, Status, User, UserIdRequest, UserIdsRequest, UserResponse,
    UsersResponse,
};

use super::HandlerContext;

#[trace]
pub async fn handle_add_user(ctx: &HandlerContext, params: User) -> Result<UserResponse, Status> {
    ctx.users.add_user(params).await
}

#[trace]
pub async fn handle_get_user_by_id(
    ctx: &HandlerContext,
    params: UserIdRequest,
) -> Result<UserResponse, Status> {
    ctx.users.get_user_by_id(params).await
}

#[trace]
pub async fn handle_get_users_by_ids(
    ctx: &HandlerContext,
    params: UserIdsRequest,
) -> Result<UsersResponse, Status> {
    ctx.users.get_users_by_ids(params).await
}

#[trace]
pub async fn handle_search_users(
    ctx: &HandlerContext,
    params: SearchRequest,
) -> Result<UsersResponse, Status> {
    ctx.users.search_users(params).await
}

#[trace]
pub async fn handle_list_users(
    ctx: &HandlerContext,
    params: ListUsersRequest,
) -> Result<UsersResponse, Status> {
    ctx.users.list_users(params).await
}
