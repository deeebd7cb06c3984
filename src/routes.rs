use crate::{api::leave, config::Config};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-scope limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let api_limiter = build_limiter(config.rate_api_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(api_limiter) // rate limiting
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::submit_leave)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(leave::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(leave::reject_leave)),
                    )
                    // /leave/{id}/cancel (admin direct)
                    .service(
                        web::resource("/{id}/cancel").route(web::put().to(leave::cancel_leave)),
                    )
                    // /leave/{id}/cancel-request sub-flow
                    .service(
                        web::resource("/{id}/cancel-request")
                            .route(web::post().to(leave::request_cancel)),
                    )
                    .service(
                        web::resource("/{id}/cancel-request/approve")
                            .route(web::put().to(leave::approve_cancel)),
                    )
                    .service(
                        web::resource("/{id}/cancel-request/reject")
                            .route(web::put().to(leave::reject_cancel)),
                    )
                    // /leave/{id}/self-cancel (48h window)
                    .service(
                        web::resource("/{id}/self-cancel").route(web::post().to(leave::self_cancel)),
                    ),
            )
            .service(
                web::scope("/balances")
                    // /balances/repair
                    .service(
                        web::resource("/repair").route(web::post().to(leave::repair_balances)),
                    )
                    // /balances/{employee_code}
                    .service(
                        web::resource("/{employee_code}")
                            .route(web::get().to(leave::get_balances)),
                    ),
            ),
    );
}
