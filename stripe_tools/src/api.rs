use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
    RequestBuilder,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::StripeConfig,
    data_objects::{Account, AccountLink, Balance, CheckoutSession, Payout, SetupIntent, StripePaymentIntent, Transfer},
    StripeApiError,
    StripeErrorDetail,
};

/// The header carrying the connected account a request acts on behalf of.
const STRIPE_ACCOUNT_HEADER: &str = "Stripe-Account";
/// The header Stripe deduplicates retried mutations on.
const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert("Authorization", val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    /// Sends a request and decodes the response, converting Stripe's error envelope into a
    /// [`StripeApiError::QueryError`] on non-2xx statuses.
    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, StripeApiError> {
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("Stripe query successful. {status}");
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let body = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            let error = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| serde_json::from_value::<StripeErrorDetail>(v["error"].clone()).ok())
                .unwrap_or_else(|| StripeErrorDetail {
                    error_type: "unknown".to_string(),
                    code: None,
                    message: Some(body),
                    payment_intent: None,
                });
            Err(StripeApiError::QueryError { status: status.as_u16(), error })
        }
    }

    /// Stripe takes form-encoded bodies, with nested fields spelled `parent[child]`.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        on_behalf_of: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("POST {url}");
        let mut req = self.client.request(Method::POST, url).form(params);
        if let Some(account) = on_behalf_of {
            req = req.header(STRIPE_ACCOUNT_HEADER, account);
        }
        self.execute(req).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        on_behalf_of: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("GET {url}");
        let mut req = self.client.request(Method::GET, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(account) = on_behalf_of {
            req = req.header(STRIPE_ACCOUNT_HEADER, account);
        }
        self.execute(req).await
    }

    /// Creates a setup-mode checkout session: the hosted page collects and saves the card
    /// without charging it. The order id rides along as session metadata so the completion
    /// webhook can be correlated.
    pub async fn create_setup_checkout_session(
        &self,
        order_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, StripeApiError> {
        let params = [
            ("mode", "setup".to_string()),
            ("customer_creation", "always".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("metadata[order_id]", order_id.to_string()),
        ];
        debug!("Creating setup checkout session for order {order_id}");
        let session = self.post_form("/checkout/sessions", &params, None).await?;
        info!("Created setup checkout session for order {order_id}");
        Ok(session)
    }

    pub async fn retrieve_setup_intent(&self, setup_intent_id: &str) -> Result<SetupIntent, StripeApiError> {
        let path = format!("/setup_intents/{setup_intent_id}");
        self.get(&path, &[], None).await
    }

    /// Charges a saved card without the customer present. `off_session` tells Stripe to apply
    /// stored authentication exemptions; `confirm` submits the charge immediately.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_off_session_payment_intent(
        &self,
        order_id: &str,
        amount: i64,
        currency: &str,
        customer_id: &str,
        payment_method_id: &str,
        transfer_group: &str,
    ) -> Result<StripePaymentIntent, StripeApiError> {
        let params = [
            ("amount", amount.to_string()),
            ("currency", currency.to_string()),
            ("customer", customer_id.to_string()),
            ("payment_method", payment_method_id.to_string()),
            ("off_session", "true".to_string()),
            ("confirm", "true".to_string()),
            ("transfer_group", transfer_group.to_string()),
            ("metadata[order_id]", order_id.to_string()),
        ];
        debug!("Creating off-session payment intent of {amount} for order {order_id}");
        let intent: StripePaymentIntent = self.post_form("/payment_intents", &params, None).await?;
        info!("Created payment intent {} for order {order_id} ({})", intent.id, intent.status);
        Ok(intent)
    }

    /// Retrieves a payment intent with its latest charge expanded, so the charge id is available
    /// as a transfer source transaction.
    pub async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<StripePaymentIntent, StripeApiError> {
        let path = format!("/payment_intents/{payment_intent_id}");
        let params = [("expand[]", "latest_charge".to_string())];
        self.get(&path, &params, None).await
    }

    /// Moves funds to a connected account. `source_transaction` pins the transfer to the settled
    /// charge so it never draws on unrelated platform balance, and the `Idempotency-Key` header
    /// lets Stripe collapse a retried transfer into the original.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_transfer(
        &self,
        destination: &str,
        amount: i64,
        currency: &str,
        transfer_group: &str,
        source_transaction: &str,
        payment_intent_id: &str,
        idempotency_key: &str,
    ) -> Result<Transfer, StripeApiError> {
        let params = [
            ("amount", amount.to_string()),
            ("currency", currency.to_string()),
            ("destination", destination.to_string()),
            ("transfer_group", transfer_group.to_string()),
            ("source_transaction", source_transaction.to_string()),
            ("metadata[payment_intent_id]", payment_intent_id.to_string()),
        ];
        debug!("Transferring {amount} to {destination}");
        let url = self.url("/transfers");
        let req = self.client.request(Method::POST, url).form(&params).header(IDEMPOTENCY_KEY_HEADER, idempotency_key);
        let transfer: Transfer = self.execute(req).await?;
        info!("Created transfer {} of {amount} to {destination}", transfer.id);
        Ok(transfer)
    }

    /// The balance of a connected account.
    pub async fn retrieve_balance(&self, account_id: &str) -> Result<Balance, StripeApiError> {
        self.get("/balance", &[], Some(account_id)).await
    }

    /// Pays out from a connected account's available balance to its external bank destination.
    pub async fn create_payout(&self, account_id: &str, amount: i64, currency: &str) -> Result<Payout, StripeApiError> {
        let params = [("amount", amount.to_string()), ("currency", currency.to_string())];
        debug!("Creating payout of {amount} from {account_id}");
        let payout: Payout = self.post_form("/payouts", &params, Some(account_id)).await?;
        info!("Created payout {} of {amount} from {account_id} ({})", payout.id, payout.status);
        Ok(payout)
    }

    /// Creates an Express connected account for a provider or referrer.
    pub async fn create_express_account(&self, email: &str) -> Result<Account, StripeApiError> {
        let params = [
            ("type", "express".to_string()),
            ("email", email.to_string()),
            ("capabilities[transfers][requested]", "true".to_string()),
        ];
        debug!("Creating express account for {email}");
        let account: Account = self.post_form("/accounts", &params, None).await?;
        info!("Created express account {}", account.id);
        Ok(account)
    }

    /// Creates a one-time onboarding link for a connected account.
    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink, StripeApiError> {
        let params = [
            ("account", account_id.to_string()),
            ("refresh_url", refresh_url.to_string()),
            ("return_url", return_url.to_string()),
            ("type", "account_onboarding".to_string()),
        ];
        self.post_form("/account_links", &params, None).await
    }
}
