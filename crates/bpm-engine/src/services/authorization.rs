//! Authorization service: grant administration

use super::ServiceContext;
use bpm_authz::AuthorizationQuery;
use bpm_command::{Command, CommandContext};
use bpm_types::{
    ensure_not_null, Authentication, Authorization, AuthorizationType, EngineResult, Permission,
    Resource,
};

/// New, unsaved grant
#[derive(Debug, Clone)]
pub struct CreateAuthorizationCmd {
    authorization_type: AuthorizationType,
    resource: Resource,
}

impl CreateAuthorizationCmd {
    pub fn new(authorization_type: AuthorizationType, resource: Resource) -> Self {
        Self {
            authorization_type,
            resource,
        }
    }
}

impl Command<Authorization> for CreateAuthorizationCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<Authorization> {
        ctx.authorization_manager()
            .create_new_authorization(self.authorization_type, self.resource)
    }

    fn name(&self) -> &'static str {
        "CreateAuthorizationCmd"
    }
}

#[derive(Debug, Clone)]
pub struct SaveAuthorizationCmd {
    authorization: Authorization,
}

impl SaveAuthorizationCmd {
    pub fn new(authorization: Authorization) -> Self {
        Self { authorization }
    }
}

impl Command<Authorization> for SaveAuthorizationCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<Authorization> {
        ctx.authorization_manager()
            .save_authorization(self.authorization.clone())
    }

    fn name(&self) -> &'static str {
        "SaveAuthorizationCmd"
    }
}

#[derive(Debug, Clone)]
pub struct DeleteAuthorizationCmd {
    authorization_id: Option<String>,
}

impl DeleteAuthorizationCmd {
    pub fn new(authorization_id: Option<String>) -> Self {
        Self { authorization_id }
    }
}

impl Command<()> for DeleteAuthorizationCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<()> {
        let authorization_id = ensure_not_null("authorizationId", self.authorization_id.as_deref())?;
        ctx.authorization_manager().delete_authorization(authorization_id)
    }

    fn name(&self) -> &'static str {
        "DeleteAuthorizationCmd"
    }
}

/// Grants readable by the subject that match a query
#[derive(Debug, Clone, Default)]
pub struct SelectAuthorizationsCmd {
    query: AuthorizationQuery,
}

impl SelectAuthorizationsCmd {
    pub fn new(query: AuthorizationQuery) -> Self {
        Self { query }
    }
}

impl Command<Vec<Authorization>> for SelectAuthorizationsCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<Vec<Authorization>> {
        ctx.authorization_manager()
            .select_authorizations(self.query.clone())
    }

    fn name(&self) -> &'static str {
        "SelectAuthorizationsCmd"
    }
}

/// Ask whether an arbitrary user holds a permission.
#[derive(Debug, Clone)]
pub struct IsUserAuthorizedCmd {
    subject: Authentication,
    permission: Permission,
    resource: Resource,
    resource_id: Option<String>,
}

impl IsUserAuthorizedCmd {
    pub fn new(
        subject: Authentication,
        permission: Permission,
        resource: Resource,
        resource_id: Option<String>,
    ) -> Self {
        Self {
            subject,
            permission,
            resource,
            resource_id,
        }
    }
}

impl Command<bool> for IsUserAuthorizedCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<bool> {
        ctx.authorization_manager().is_subject_authorized(
            &self.subject,
            self.permission,
            self.resource,
            self.resource_id.as_deref(),
        )
    }

    fn name(&self) -> &'static str {
        "IsUserAuthorizedCmd"
    }
}

pub struct AuthorizationService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> AuthorizationService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    /// A transient grant; nothing is stored until [`Self::save_authorization`]
    pub fn create_new_authorization(
        &self,
        authorization_type: AuthorizationType,
        resource: Resource,
    ) -> EngineResult<Authorization> {
        self.ctx
            .execute(&CreateAuthorizationCmd::new(authorization_type, resource))
    }

    pub fn save_authorization(&self, authorization: Authorization) -> EngineResult<Authorization> {
        self.ctx.execute(&SaveAuthorizationCmd::new(authorization))
    }

    pub fn delete_authorization(&self, authorization_id: impl Into<String>) -> EngineResult<()> {
        self.ctx
            .execute(&DeleteAuthorizationCmd::new(Some(authorization_id.into())))
    }

    pub fn authorizations(&self, query: AuthorizationQuery) -> EngineResult<Vec<Authorization>> {
        self.ctx.execute(&SelectAuthorizationsCmd::new(query))
    }

    pub fn count_authorizations(&self, query: AuthorizationQuery) -> EngineResult<usize> {
        Ok(self.authorizations(query)?.len())
    }

    pub fn is_user_authorized(
        &self,
        user_id: impl Into<String>,
        group_ids: Vec<String>,
        permission: Permission,
        resource: Resource,
        resource_id: Option<&str>,
    ) -> EngineResult<bool> {
        let subject = Authentication::new(user_id).with_groups(group_ids);
        self.ctx.execute(&IsUserAuthorizedCmd::new(
            subject,
            permission,
            resource,
            resource_id.map(str::to_string),
        ))
    }
}
