use async_trait::async_trait;
use leasehold_api_types::{LoginInput, RegisterInput, SessionOutput};
use serde_json::Value;

use crate::application::auth::AuthService;
use crate::application::context::RpcContext;
use crate::infra::http::rpc::error::RpcError;

use super::{Access, Procedure, RpcNamespace, output, parse_input, unknown_procedure};

const PROCEDURES: &[Procedure] = &[
    Procedure::mutation("register", Access::Public),
    Procedure::mutation("login", Access::Public),
    Procedure::query("session", Access::Public),
];

pub struct AuthRouter {
    service: AuthService,
}

impl AuthRouter {
    pub fn new(service: AuthService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RpcNamespace for AuthRouter {
    fn name(&self) -> &'static str {
        "auth"
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
            "register" => {
                let input: RegisterInput = parse_input(input)?;
                output(self.service.register(input).await?)
            }
            "login" => {
                let input: LoginInput = parse_input(input)?;
                output(self.service.login(input).await?)
            }
            "session" => output(SessionOutput {
                authenticated: ctx.is_authenticated(),
                user_id: ctx.user_id,
                locale: ctx.locale,
            }),
            other => Err(unknown_procedure(self.name(), other)),
        }
    }
}
