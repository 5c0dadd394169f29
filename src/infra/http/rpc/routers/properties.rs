use async_trait::async_trait;
use leasehold_api_types::{
    CreatePropertyInput, PropertyIdInput, PropertyListInput, PropertySlugInput,
    UpdatePropertyInput,
};
use serde_json::Value;

use crate::application::context::RpcContext;
use crate::application::properties::PropertyService;
use crate::infra::http::rpc::error::RpcError;

use super::{Access, Procedure, RpcNamespace, caller, output, parse_input, unknown_procedure};

const PROCEDURES: &[Procedure] = &[
    Procedure::query("list", Access::Public),
    Procedure::query("byId", Access::Public),
    Procedure::query("bySlug", Access::Public),
    Procedure::query("mine", Access::Protected),
    Procedure::mutation("create", Access::Protected),
    Procedure::mutation("update", Access::Protected),
    Procedure::mutation("delete", Access::Protected),
];

pub struct PropertiesRouter {
    service: PropertyService,
}

impl PropertiesRouter {
    pub fn new(service: PropertyService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RpcNamespace for PropertiesRouter {
    fn name(&self) -> &'static str {
        "properties"
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
        let locale = ctx.locale;
        match procedure {
            "list" => {
                let filter: PropertyListInput = parse_input(input)?;
                output(self.service.list(filter, locale).await?)
            }
            "byId" => {
                let PropertyIdInput { id } = parse_input(input)?;
                output(self.service.by_id(id, locale).await?)
            }
            "bySlug" => {
                let PropertySlugInput { slug } = parse_input(input)?;
                output(self.service.by_slug(&slug, locale).await?)
            }
            "mine" => output(self.service.mine(caller(ctx)?, locale).await?),
            "create" => {
                let input: CreatePropertyInput = parse_input(input)?;
                output(self.service.create(caller(ctx)?, input, locale).await?)
            }
            "update" => {
                let input: UpdatePropertyInput = parse_input(input)?;
                output(self.service.update(caller(ctx)?, input, locale).await?)
            }
            "delete" => {
                let PropertyIdInput { id } = parse_input(input)?;
                output(self.service.delete(caller(ctx)?, id).await?)
            }
            other => Err(unknown_procedure(self.name(), other)),
        }
    }
}
