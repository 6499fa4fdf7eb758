//! 重定向服务
//!
//! 全系统唯一的响应路径契约：
//! 1. 同步解析 (hostname, slug)
//! 2. 解析成功立即 302（Cache-Control: no-store），响应不等待任何下游
//! 3. 计数、入队在分离任务里做，带超时，任何失败只记日志
//!
//! 未解析与目录错误一律 404：对短链接而言 404 严格好于 5xx。

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use tracing::{debug, error, trace, warn};

use crate::analytics::enricher::ClickRequestContext;
use crate::analytics::{ClickEvent, ClickPipeline, enrich};
use crate::api::envelope::{ApiErrorCode, error_response};
use crate::config::get_config;
use crate::counter::WorkspaceCounters;
use crate::services::{PlanCache, Resolution, Resolver};
use crate::storage::{Plan, ResolvedLink};
use crate::utils::ip::extract_client_ip;
use crate::utils::is_valid_slug;

pub struct RedirectService {}

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        resolver: web::Data<Arc<Resolver>>,
        counters: web::Data<Arc<WorkspaceCounters>>,
        plan_cache: web::Data<Arc<PlanCache>>,
        pipeline: web::Data<Arc<ClickPipeline>>,
    ) -> impl Responder {
        let slug = path.into_inner();

        if slug.is_empty() || !is_valid_slug(&slug) {
            // 非法 slug 直接 404，不触达目录
            trace!("Invalid slug rejected: {}", &slug);
            return Self::not_found_response();
        }

        let hostname = req.connection_info().host().to_string();

        match resolver.resolve(&hostname, &slug).await {
            Ok(Resolution::Resolved(link)) => {
                // 响应之外的一切放进分离任务
                let ctx = Self::extract_click_context(&req);
                Self::spawn_tracking(
                    link.clone(),
                    ctx,
                    Arc::clone(counters.get_ref()),
                    Arc::clone(plan_cache.get_ref()),
                    Arc::clone(pipeline.get_ref()),
                );
                Self::finish_redirect(&link)
            }
            Ok(Resolution::Unresolved) => {
                debug!("Unresolved: {}/{}", hostname, slug);
                Self::not_found_response()
            }
            Err(e) => {
                // 目录故障降级为 404，绝不向点击者暴露 5xx
                error!("Catalog error during redirect lookup: {}", e);
                Self::not_found_response()
            }
        }
    }

    /// 提取点击元数据（富化的全部输入，在请求仍在手时取齐）
    fn extract_click_context(req: &HttpRequest) -> ClickRequestContext {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        ClickRequestContext {
            ts: Utc::now(),
            remote_ip: extract_client_ip(req),
            user_agent: header("user-agent"),
            referrer: header("referer"),
            request_id: header("x-request-id"),
            country: header("x-geo-country").or_else(|| header("cf-ipcountry")),
            region: header("x-geo-region"),
            city: header("x-geo-city"),
        }
    }

    /// 分离任务：富化 → 计数 → 入队，带超时上限
    fn spawn_tracking(
        link: ResolvedLink,
        ctx: ClickRequestContext,
        counters: Arc<WorkspaceCounters>,
        plan_cache: Arc<PlanCache>,
        pipeline: Arc<ClickPipeline>,
    ) {
        let config = get_config();
        let deadline = Duration::from_secs(config.analytics.detached_task_deadline_secs.max(1));
        let free_cap = config.usage.free_monthly_cap;

        tokio::spawn(async move {
            let tracked = tokio::time::timeout(
                deadline,
                Self::track_click(link, ctx, counters, plan_cache, pipeline, free_cap),
            )
            .await;
            match tracked {
                Err(_) => warn!("Click tracking abandoned: deadline exceeded"),
                Ok(Err(e)) => warn!("Click tracking failed (redirect unaffected): {}", e),
                Ok(Ok(())) => {}
            }
        });
    }

    /// 点击跟踪主体（响应已经发出，这里的一切失败都只是丢失跟踪）
    async fn track_click(
        link: ResolvedLink,
        ctx: ClickRequestContext,
        counters: Arc<WorkspaceCounters>,
        plan_cache: Arc<PlanCache>,
        pipeline: Arc<ClickPipeline>,
        free_cap: i64,
    ) -> anyhow::Result<()> {
        let event: ClickEvent = enrich(&link, &ctx);

        // bot 不计数也不入队
        if event.bot_suspected {
            trace!("Bot click ignored: {}", event.click_id);
            return Ok(());
        }

        let Some(plan) = plan_cache.get_plan(&link.workspace_id).await? else {
            warn!(
                "Workspace {} missing during click tracking, click untracked",
                link.workspace_id
            );
            return Ok(());
        };

        match plan {
            Plan::Free => {
                let outcome = counters
                    .increment_free_if_under_cap(&link.workspace_id, free_cap)
                    .await?;
                if !outcome.incremented {
                    // 触顶：静默停止跟踪，重定向不受影响
                    debug!(
                        "Free cap reached for {}, click untracked",
                        link.workspace_id
                    );
                    return Ok(());
                }
            }
            Plan::Pro => {
                counters.increment_pro(&link.workspace_id).await?;
            }
        }

        // 计数成功后才入队；入队失败在 submit 内部记日志并吞掉
        pipeline.submit(event);
        Ok(())
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        error_response(ApiErrorCode::NotFound, "Short link not found")
    }

    fn finish_redirect(link: &ResolvedLink) -> HttpResponse {
        HttpResponse::build(StatusCode::FOUND)
            .insert_header(("Location", link.destination_url.as_str()))
            .insert_header(("Cache-Control", "no-store"))
            .finish()
    }
}

/// Redirect 路由配置
pub fn redirect_routes() -> actix_web::Scope {
    web::scope("")
        .route("/{slug}", web::get().to(RedirectService::handle_redirect))
        .route("/{slug}", web::head().to(RedirectService::handle_redirect))
}
