//! Workspace API 认证中间件
//!
//! 认证协作方的交接点：Bearer api_key（或 X-Api-Key）→ workspace。
//! 解析成功后把 AuthedWorkspace（租户 id + 套餐）放进请求扩展，
//! 下游 handler 只消费身份，不再触碰凭据。

use std::rc::Rc;
use std::sync::Arc;

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{trace, warn};

use crate::api::envelope::{ApiErrorCode, error_response};
use crate::storage::{Plan, SeaOrmStorage};

/// 认证后的调用方身份
#[derive(Debug, Clone)]
pub struct AuthedWorkspace {
    pub workspace_id: String,
    pub plan: Plan,
}

/// Workspace authentication middleware
#[derive(Clone)]
pub struct WorkspaceAuth;

impl<S, B> Transform<S, ServiceRequest> for WorkspaceAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = WorkspaceAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WorkspaceAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct WorkspaceAuthMiddleware<S> {
    service: Rc<S>,
}

/// 从请求头取 api_key：Authorization: Bearer 优先，其次 X-Api-Key
fn extract_api_key(req: &ServiceRequest) -> Option<String> {
    if let Some(value) = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        && let Some(token) = value.strip_prefix("Bearer ")
        && !token.is_empty()
    {
        return Some(token.to_string());
    }

    req.headers()
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl<S, B> Service<ServiceRequest> for WorkspaceAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            // CORS 预检直接放行
            if req.method() == Method::OPTIONS {
                return service.call(req).await.map(|res| res.map_into_left_body());
            }

            let Some(api_key) = extract_api_key(&req) else {
                warn!("Analytics API request without credentials");
                return Ok(unauthorized(req, "Missing API key"));
            };

            let Some(storage) = req
                .app_data::<web::Data<Arc<SeaOrmStorage>>>()
                .map(|d| Arc::clone(d.get_ref()))
            else {
                return Ok(internal_error(req));
            };

            match storage.get_workspace_by_api_key(&api_key).await {
                Ok(Some(workspace)) => {
                    trace!("Authenticated workspace {}", workspace.id);
                    req.extensions_mut().insert(AuthedWorkspace {
                        workspace_id: workspace.id,
                        plan: Plan::parse(&workspace.plan),
                    });
                    service.call(req).await.map(|res| res.map_into_left_body())
                }
                Ok(None) => {
                    warn!("Analytics API request with unknown API key");
                    Ok(unauthorized(req, "Invalid API key"))
                }
                Err(e) => {
                    warn!("Workspace lookup failed during auth: {}", e);
                    Ok(internal_error(req))
                }
            }
        })
    }
}

fn unauthorized<B>(req: ServiceRequest, message: &str) -> ServiceResponse<EitherBody<B>> {
    req.into_response(error_response(ApiErrorCode::Unauthorized, message).map_into_right_body())
}

fn internal_error<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
    let response: HttpResponse =
        error_response(ApiErrorCode::InternalError, "Internal server error");
    req.into_response(response.map_into_right_body())
}
