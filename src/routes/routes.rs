use actix_web::web;

use crate::handlers::group_handlers::{
    create_group, delete_group, get_group, group_stats, list_group_codes, list_groups,
    update_group,
};
use crate::handlers::health_handlers::health_check;
use crate::handlers::qr_handlers::{
    create_qr_code, delete_qr_code, get_qr_code, list_qr_codes, qr_code_image, qr_code_stats,
    static_qr, update_qr_code,
};
use crate::handlers::redirect_handlers::{redirect, redirect_for_owner};
use crate::handlers::stats_handlers::dashboard_stats;
use crate::middlewares::JwtAuth;

/// Configure the routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // Public routes are registered ahead of the authenticated /api scope so
    // they match first.
    cfg.route("/api/qr/{short_code}", web::get().to(redirect))
        .route("/api/qr/{user_id}/{short_code}", web::get().to(redirect_for_owner))
        .route("/api/health/check", web::get().to(health_check));

    cfg.service(
        web::scope("/api")
            .wrap(JwtAuth)
            .service(
                web::scope("/qrcodes")
                    .route("", web::post().to(create_qr_code))
                    .route("", web::get().to(list_qr_codes))
                    .route("/{id}", web::get().to(get_qr_code))
                    .route("/{id}", web::patch().to(update_qr_code))
                    .route("/{id}", web::delete().to(delete_qr_code))
                    .route("/{id}/stats", web::get().to(qr_code_stats))
                    .route("/{id}/image", web::get().to(qr_code_image)),
            )
            .service(
                web::scope("/groups")
                    .route("", web::post().to(create_group))
                    .route("", web::get().to(list_groups))
                    .route("/{id}", web::get().to(get_group))
                    .route("/{id}", web::patch().to(update_group))
                    .route("/{id}", web::delete().to(delete_group))
                    .route("/{id}/qrcodes", web::get().to(list_group_codes))
                    .route("/{id}/stats", web::get().to(group_stats)),
            )
            .route("/stats", web::get().to(dashboard_stats))
            .route("/static-qr", web::post().to(static_qr)),
    );
}
