//! Procedure registry: the application router and its three namespaces.

mod auth;
mod properties;
mod users;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::application::auth::AuthService;
use crate::application::context::RpcContext;
use crate::application::properties::PropertyService;
use crate::application::users::UserService;

use super::error::{RpcError, RpcErrorCode};

pub use auth::AuthRouter;
pub use properties::PropertiesRouter;
pub use users::UsersRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    /// Served over `GET`.
    Query,
    /// Served over `POST`.
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Requires an authenticated caller.
    Protected,
}

#[derive(Debug, Clone, Copy)]
pub struct Procedure {
    pub name: &'static str,
    pub kind: ProcedureKind,
    pub access: Access,
}

impl Procedure {
    pub const fn query(name: &'static str, access: Access) -> Self {
        Self {
            name,
            kind: ProcedureKind::Query,
            access,
        }
    }

    pub const fn mutation(name: &'static str, access: Access) -> Self {
        Self {
            name,
            kind: ProcedureKind::Mutation,
            access,
        }
    }
}

#[async_trait]
pub trait RpcNamespace: Send + Sync {
    fn name(&self) -> &'static str;

    fn procedures(&self) -> &'static [Procedure];

    /// Invoke `procedure` after kind and access have been checked.
    async fn call(&self, procedure: &str, ctx: &RpcContext, input: Value)
    -> Result<Value, RpcError>;
}

/// Composes the `auth`, `properties` and `users` namespaces.
#[derive(Clone)]
pub struct AppRouter {
    namespaces: Vec<Arc<dyn RpcNamespace>>,
}

impl AppRouter {
    pub fn new(auth: AuthService, properties: PropertyService, users: UserService) -> Self {
        Self {
            namespaces: vec![
                Arc::new(AuthRouter::new(auth)),
                Arc::new(PropertiesRouter::new(properties)),
                Arc::new(UsersRouter::new(users)),
            ],
        }
    }

    pub fn namespaces(&self) -> Vec<&'static str> {
        self.namespaces.iter().map(|ns| ns.name()).collect()
    }

    /// Look up `namespace.procedure`.
    pub fn resolve(&self, path: &str) -> Option<(&dyn RpcNamespace, Procedure)> {
        let (namespace, procedure) = path.split_once('.')?;
        let ns = self.namespaces.iter().find(|ns| ns.name() == namespace)?;
        let found = ns
            .procedures()
            .iter()
            .find(|candidate| candidate.name == procedure)?;
        Some((ns.as_ref(), *found))
    }

    pub async fn call(
        &self,
        path: &str,
        kind: ProcedureKind,
        ctx: &RpcContext,
        input: Value,
    ) -> Result<Value, RpcError> {
        let (namespace, procedure) = self
            .resolve(path)
            .ok_or_else(|| RpcError::not_found(format!("No procedure found on path \"{path}\"")))?;

        if procedure.kind != kind {
            let expected = match procedure.kind {
                ProcedureKind::Query => "GET",
                ProcedureKind::Mutation => "POST",
            };
            return Err(RpcError::new(
                RpcErrorCode::MethodNotSupported,
                format!("Unsupported method for \"{path}\", use {expected}"),
            ));
        }

        if procedure.access == Access::Protected && !ctx.is_authenticated() {
            return Err(RpcError::unauthorized());
        }

        namespace.call(procedure.name, ctx, input).await
    }
}

/// Decode procedure input. A missing input decodes like an empty object, so
/// inputs whose fields are all optional may be omitted.
pub(crate) fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, RpcError> {
    let input = match input {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(input).map_err(|err| RpcError::bad_request(format!("Invalid input: {err}")))
}

pub(crate) fn output<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|err| RpcError::internal(&err))
}

pub(crate) fn caller(ctx: &RpcContext) -> Result<i64, RpcError> {
    ctx.user_id.ok_or_else(RpcError::unauthorized)
}

pub(crate) fn unknown_procedure(namespace: &str, procedure: &str) -> RpcError {
    RpcError::not_found(format!(
        "No procedure found on path \"{namespace}.{procedure}\""
    ))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::application::tokens::TokenService;
    use crate::domain::locale::Locale;
    use crate::infra::memory::InMemoryRepositories;

    fn router() -> AppRouter {
        let repos = Arc::new(InMemoryRepositories::new());
        let tokens = Arc::new(TokenService::new(Some("secret"), Duration::from_secs(60)));
        AppRouter::new(
            AuthService::new(repos.clone(), tokens),
            PropertyService::new(repos.clone()),
            UserService::new(repos),
        )
    }

    #[test]
    fn composes_exactly_three_namespaces() {
        assert_eq!(router().namespaces(), vec!["auth", "properties", "users"]);
    }

    #[test]
    fn resolves_known_paths_only() {
        let router = router();
        assert!(router.resolve("properties.list").is_some());
        assert!(router.resolve("properties.nope").is_none());
        assert!(router.resolve("billing.list").is_none());
        assert!(router.resolve("properties").is_none());
    }

    #[tokio::test]
    async fn wrong_kind_is_method_not_supported() {
        let err = router()
            .call(
                "auth.login",
                ProcedureKind::Query,
                &RpcContext::anonymous(Locale::En),
                Value::Null,
            )
            .await
            .expect_err("kind");
        assert_eq!(err.code, RpcErrorCode::MethodNotSupported);
    }

    #[tokio::test]
    async fn protected_procedures_require_a_user() {
        let err = router()
            .call(
                "users.me",
                ProcedureKind::Query,
                &RpcContext::anonymous(Locale::En),
                Value::Null,
            )
            .await
            .expect_err("anonymous");
        assert_eq!(err.code, RpcErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn malformed_input_is_bad_request() {
        let err = router()
            .call(
                "properties.byId",
                ProcedureKind::Query,
                &RpcContext::anonymous(Locale::En),
                json!({ "id": "seven" }),
            )
            .await
            .expect_err("input");
        assert_eq!(err.code, RpcErrorCode::BadRequest);
    }
}
