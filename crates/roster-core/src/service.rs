use async_trait::async_trait;
use roster_types::{
    ListUsersRequest, SearchRequest, Status, User, UserIdRequest, UserIdsRequest, UserResponse,
    UsersResponse,
};

use crate::model::{self, SearchCriteria};
use crate::repository::UserRepository;

/// Wire-facing user operations. Each call converts the request into domain
/// terms, runs it against the repository and converts the outcome back.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn add_user(&self, req: User) -> Result<UserResponse, Status>;
    async fn get_user_by_id(&self, req: UserIdRequest) -> Result<UserResponse, Status>;
    async fn get_users_by_ids(&self, req: UserIdsRequest) -> Result<UsersResponse, Status>;
    async fn search_users(&self, req: SearchRequest) -> Result<UsersResponse, Status>;
    async fn list_users(&self, req: ListUsersRequest) -> Result<UsersResponse, Status>;
    async fn user_count(&self) -> usize;
}

pub struct UserServiceImpl<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserServiceImpl<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }
}

fn to_users_response(users: Vec<model::User>) -> UsersResponse {
    UsersResponse {
        users: users.into_iter().map(User::from).collect(),
    }
}

#[async_trait]
impl<R: UserRepository> UserService for UserServiceImpl<R> {
    async fn add_user(&self, req: User) -> Result<UserResponse, Status> {
        let user = self.repo.add_user(model::User::from(req)).await?;
        Ok(UserResponse { user: user.into() })
    }

    async fn get_user_by_id(&self, req: UserIdRequest) -> Result<UserResponse, Status> {
        let user = self.repo.get_user_by_id(req.id).await?;
        Ok(UserResponse { user: user.into() })
    }

    async fn get_users_by_ids(&self, req: UserIdsRequest) -> Result<UsersResponse, Status> {
        let users = self.repo.get_users_by_id(&req.ids).await;
        Ok(to_users_response(users))
    }

    async fn search_users(&self, req: SearchRequest) -> Result<UsersResponse, Status> {
        let criteria = SearchCriteria::from(req);
        let users = self.repo.search_users(&criteria).await?;
        Ok(to_users_response(users))
    }

    async fn list_users(&self, req: ListUsersRequest) -> Result<UsersResponse, Status> {
        let users = self.repo.list_users(req.page_size, req.page).await;
        Ok(to_users_response(users))
    }

    async fn user_count(&self) -> usize {
        self.repo.count_users().await
    }
}
