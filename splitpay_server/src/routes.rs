//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) should be expressed as futures or asynchronous functions. Async handlers get executed
//! concurrently by worker threads and thus don't block execution.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use spg_common::Cents;
use splitpay_engine::{
    db_types::{NewOrder, OrderId},
    traits::{OrderStore, PaymentProcessor},
    CheckoutApi,
    EventOutcome,
    IgnoreReason,
    ReconcilerApi,
};
use stripe_tools::{StripeApi, StripeEvent};

use crate::{
    config::ServerConfig,
    data_objects::{
        ChargeOrderRequest,
        CreateSetupSessionRequest,
        CreateSetupSessionResponse,
        JsonResponse,
        OnboardAccountRequest,
        OnboardAccountResponse,
        ReleasePayoutRequest,
        ReleasePayoutResponse,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::stripe::decode_event,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//--------------------------------------   Create setup session  -----------------------------------------------
route!(create_setup_session => Post "/create-setup-session" impl OrderStore, PaymentProcessor);
/// Route handler for the create-setup-session endpoint
///
/// Stores a new order and creates a hosted card-collection session in "save card, no charge"
/// mode. The response carries the session URL the customer must be redirected to. The card is
/// charged later, off-session, via [`charge_order`].
///
/// Returns 409 if an order with the same `order_id` already exists.
pub async fn create_setup_session<B: OrderStore, P: PaymentProcessor>(
    api: web::Data<CheckoutApi<B, P>>,
    body: web::Json<CreateSetupSessionRequest>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST create-setup-session for order {}", params.order_id);
    if params.amount_cents <= 0 {
        return Err(ServerError::InvalidRequestBody(format!(
            "amount_cents must be positive, got {}",
            params.amount_cents
        )));
    }
    let mut order = NewOrder::new(
        OrderId::from(params.order_id),
        Cents::from(params.amount_cents),
        params.provider_account_id,
        params.referrer_account_id,
    );
    if let Some(currency) = params.currency {
        order = order.with_currency(currency);
    }
    let result = api.create_setup_session(order).await?;
    let response = CreateSetupSessionResponse {
        order: result.order,
        session_id: result.session.session_id,
        checkout_url: result.session.url,
    };
    Ok(HttpResponse::Ok().json(response))
}

//--------------------------------------       Charge order      -----------------------------------------------
route!(charge_order => Post "/charge-order" impl OrderStore, PaymentProcessor);
/// Route handler for the charge-order endpoint
///
/// Submits the delayed, off-session charge for an order whose card has been saved. Typically
/// called on the service date by a scheduler or an operator. The call is idempotent: charging an
/// order that has already been charged returns the stored order without contacting the processor.
///
/// * 404 if the order does not exist,
/// * 412 if the card for the order has not been saved yet,
/// * 402 if the processor demands additional customer authentication (the order is parked and the
///   call can be retried after the customer authenticates) or the card was declined.
pub async fn charge_order<B: OrderStore, P: PaymentProcessor>(
    api: web::Data<CheckoutApi<B, P>>,
    body: web::Json<ChargeOrderRequest>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(body.into_inner().order_id);
    debug!("💻️ POST charge-order for order {order_id}");
    let order = api.charge_order_now(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//--------------------------------------      Release payout     -----------------------------------------------
route!(release_payout => Post "/release-payout" impl OrderStore, PaymentProcessor);
/// Route handler for the release-payout endpoint
///
/// Moves money from a connected account's available balance to its external bank destination.
/// Returns 400 without creating a payout when the requested amount exceeds the available balance.
pub async fn release_payout<B: OrderStore, P: PaymentProcessor>(
    api: web::Data<CheckoutApi<B, P>>,
    body: web::Json<ReleasePayoutRequest>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST release-payout of {} for {}", params.amount_cents, params.connected_account_id);
    if params.amount_cents <= 0 {
        return Err(ServerError::InvalidRequestBody(format!(
            "amount_cents must be positive, got {}",
            params.amount_cents
        )));
    }
    let amount = Cents::from(params.amount_cents);
    let receipt = api.release_payout(&params.connected_account_id, amount).await?;
    let response = ReleasePayoutResponse { payout_id: receipt.payout_id, status: receipt.status, amount };
    Ok(HttpResponse::Ok().json(response))
}

//--------------------------------------         Webhook         -----------------------------------------------
// Registered inside the signature-checked "/webhook" scope, hence the empty resource path
route!(webhook => Post "" impl OrderStore, PaymentProcessor);
/// Route handler for the processor webhook endpoint
///
/// The signature middleware has already verified the payload's authenticity by the time this
/// handler runs. The raw body is decoded into an engine event and handed to the reconciler.
/// Duplicates and business misses are acknowledged with 200 so the processor stops redelivering;
/// internal failures return 5xx so it retries.
pub async fn webhook<B: OrderStore, P: PaymentProcessor>(
    req: HttpRequest,
    api: web::Data<ReconcilerApi<B, P>>,
    config: web::Data<ServerConfig>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError> {
    let envelope: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!("💻️ Could not deserialize webhook payload. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let event_id = envelope.id.clone();
    let remote_ip = get_remote_ip(&req, config.use_x_forwarded_for, config.use_forwarded);
    debug!("💻️ POST webhook {event_id} ({}) from {remote_ip:?}", envelope.event_type);
    let event = decode_event(envelope).map_err(|e| {
        warn!("💻️ Webhook {event_id} carries a malformed object payload. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let outcome = api.process_event(event).await?;
    let message = match outcome {
        EventOutcome::Duplicate => format!("Event {event_id} already processed"),
        EventOutcome::Ignored(reason) => {
            let reason = match reason {
                IgnoreReason::UnknownOrder => "no matching order",
                IgnoreReason::NoSetupReference => "no setup reference",
                IgnoreReason::SettlementUnavailable => "settlement not available yet",
                IgnoreReason::StaleStatus => "order already progressed",
                IgnoreReason::UnhandledEventType => "unhandled event type",
            };
            format!("Event {event_id} acknowledged ({reason})")
        },
        EventOutcome::CardSaved(order) => format!("Card saved for order {}", order.order_id),
        EventOutcome::Settled(order) => format!("Order {} paid and transferred", order.order_id),
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

//--------------------------------------       Onboarding        -----------------------------------------------
#[actix_web::post("/onboarding/account")]
/// Route handler for connected-account onboarding
///
/// Creates an Express connected account for a provider or referrer and returns the hosted
/// onboarding link. The resulting account id is what orders reference as
/// `provider_account_id`/`referrer_account_id`.
pub async fn onboard_account(
    api: web::Data<StripeApi>,
    body: web::Json<OnboardAccountRequest>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST onboarding/account for {}", params.email);
    let account =
        api.create_express_account(&params.email).await.map_err(|e| ServerError::ProcessorError(e.to_string()))?;
    let link = api
        .create_account_link(&account.id, &params.refresh_url, &params.return_url)
        .await
        .map_err(|e| ServerError::ProcessorError(e.to_string()))?;
    info!("💻️ Created connected account {} for {}", account.id, params.email);
    let response = OnboardAccountResponse { account_id: account.id, onboarding_url: link.url };
    Ok(HttpResponse::Ok().json(response))
}
