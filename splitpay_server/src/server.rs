use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use splitpay_engine::{CheckoutApi, CheckoutConfig, ReconcilerApi, SqliteDatabase};
use stripe_tools::StripeApi;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::stripe::StripeProcessor,
    middleware::SignatureMiddlewareFactory,
    purge_worker::start_purge_worker,
    routes::{health, onboard_account, ChargeOrderRoute, CreateSetupSessionRoute, ReleasePayoutRoute, WebhookRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    start_purge_worker(db.clone(), config.event_retention);
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let stripe_api = StripeApi::new(config.stripe_config.clone())
            .expect("The Stripe client configuration must be valid at this point");
        let processor = StripeProcessor::new(stripe_api.clone());
        let checkout_config =
            CheckoutConfig { currency: config.currency.clone(), frontend_url: config.frontend_url.clone() };
        let checkout_api = CheckoutApi::new(db.clone(), processor.clone(), checkout_config);
        let reconciler_api =
            ReconcilerApi::new(db.clone(), processor, config.split, config.currency.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(reconciler_api))
            .app_data(web::Data::new(stripe_api));
        // The webhook is the only route the processor calls; everything it delivers is
        // authenticated by signature rather than by session.
        let webhook_scope = web::scope("/webhook")
            .wrap(SignatureMiddlewareFactory::new(
                config.stripe_config.webhook_secret.clone(),
                config.signature_checks,
            ))
            .service(WebhookRoute::<SqliteDatabase, StripeProcessor>::new());
        app.service(health)
            .service(CreateSetupSessionRoute::<SqliteDatabase, StripeProcessor>::new())
            .service(ChargeOrderRoute::<SqliteDatabase, StripeProcessor>::new())
            .service(ReleasePayoutRoute::<SqliteDatabase, StripeProcessor>::new())
            .service(onboard_account)
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
