use async_trait::async_trait;
use leasehold_api_types::{UpdateProfileInput, UserIdInput};
use serde_json::Value;

use crate::application::context::RpcContext;
use crate::application::users::UserService;
use crate::infra::http::rpc::error::RpcError;

use super::{Access, Procedure, RpcNamespace, caller, output, parse_input, unknown_procedure};

const PROCEDURES: &[Procedure] = &[
    Procedure::query("me", Access::Protected),
    Procedure::query("byId", Access::Public),
    Procedure::mutation("updateProfile", Access::Protected),
];

pub struct UsersRouter {
    service: UserService,
}

impl UsersRouter {
    pub fn new(service: UserService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RpcNamespace for UsersRouter {
    fn name(&self) -> &'static str {
        "users"
    }

    fn procedures(&self) -> &'static [Procedure] {
        PROCEDURES
    }

    async fn call(
        &self,
        procedure: &str,
        ctx: &RpcContext,
        input: Value,
    ) -> Result<Value, RpcError> {
        match procedure {
            "me" => output(self.service.profile(caller(ctx)?).await?),
            "byId" => {
                let UserIdInput { id } = parse_input(input)?;
                output(self.service.public_profile(id).await?)
            }
            "updateProfile" => {
                let input: UpdateProfileInput = parse_input(input)?;
                output(self.service.update_profile(caller(ctx)?, input).await?)
            }
            other => Err(unknown_procedure(self.name(), other)),
        }
    }
}
