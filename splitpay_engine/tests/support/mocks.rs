use mockall::mock;
use spg_common::Cents;
use splitpay_engine::traits::{
    ChargeSubmission,
    OffSessionChargeRequest,
    PaymentProcessor,
    PayoutReceipt,
    ProcessorError,
    SetupConfirmation,
    SetupSession,
    SetupSessionRequest,
    TransferReceipt,
    TransferRequest,
};

mock! {
    pub Processor {}
    impl PaymentProcessor for Processor {
        async fn create_setup_session(&self, request: &SetupSessionRequest) -> Result<SetupSession, ProcessorError>;
        async fn retrieve_setup_confirmation(&self, setup_ref: &str) -> Result<SetupConfirmation, ProcessorError>;
        async fn charge_off_session(&self, request: &OffSessionChargeRequest) -> Result<ChargeSubmission, ProcessorError>;
        async fn fetch_settlement_reference(&self, payment_intent_id: &str) -> Result<Option<String>, ProcessorError>;
        async fn create_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ProcessorError>;
        async fn available_balance(&self, account_id: &str, currency: &str) -> Result<Cents, ProcessorError>;
        async fn create_payout(&self, account_id: &str, amount: Cents, currency: &str) -> Result<PayoutReceipt, ProcessorError>;
    }
}
