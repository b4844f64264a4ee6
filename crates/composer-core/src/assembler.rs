//! One-shot transaction assembly.

use std::future::Future;

use composer_types::SimpleTransaction;
use move_core_types::account_address::AccountAddress;
use tracing::info;

use crate::context::ComposerContext;
use crate::error::{ComposerError, ComposerResult};
use crate::session::ComposerSession;

pub const DEFAULT_MAX_GAS_AMOUNT: u64 = 200_000;
pub const DEFAULT_EXPIRATION_SECS: u64 = 20;

/// Options for the generated raw transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOptions {
    pub max_gas_amount: u64,
    /// Estimated by the node when unset.
    pub gas_unit_price: Option<u64>,
    pub expiration_secs_from_now: u64,
    /// Read from the sender's account when unset.
    pub account_sequence_number: Option<u64>,
    /// Reserve a fee payer slot (placeholder `0x0`).
    pub with_fee_payer: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            max_gas_amount: DEFAULT_MAX_GAS_AMOUNT,
            gas_unit_price: None,
            expiration_secs_from_now: DEFAULT_EXPIRATION_SECS,
            account_sequence_number: None,
            with_fee_payer: false,
        }
    }
}

impl TransactionOptions {
    pub fn with_max_gas_amount(mut self, amount: u64) -> Self {
        self.max_gas_amount = amount;
        self
    }

    pub fn with_gas_unit_price(mut self, price: u64) -> Self {
        self.gas_unit_price = Some(price);
        self
    }

    pub fn with_expiration_secs_from_now(mut self, secs: u64) -> Self {
        self.expiration_secs_from_now = secs;
        self
    }

    pub fn with_sequence_number(mut self, sequence_number: u64) -> Self {
        self.account_sequence_number = Some(sequence_number);
        self
    }

    pub fn with_fee_payer(mut self) -> Self {
        self.with_fee_payer = true;
        self
    }

    /// Absolute expiration, counted from the current wall clock.
    pub fn expiration_timestamp_secs(&self) -> u64 {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        now.saturating_add(self.expiration_secs_from_now)
    }
}

/// Compose a script in a fresh session and wrap it in an unsigned transaction.
///
/// `builder` receives the session, adds calls to it and hands it back.
///
/// ```ignore
/// let tx = assemble_transaction(sender, &context, TransactionOptions::default(), |mut session| async move {
///     session
///         .add_batched_calls(BatchedCallRequest::new("0x1::aptos_account::transfer")
///             .argument(CallArgument::new_signer(0))
///             .argument(json!("0xb0b"))
///             .argument(json!(100)))
///         .await?;
///     Ok::<_, ComposerError>(session)
/// })
/// .await?;
/// ```
pub async fn assemble_transaction<F, Fut>(
    sender: AccountAddress,
    context: &ComposerContext,
    options: TransactionOptions,
    builder: F,
) -> ComposerResult<SimpleTransaction>
where
    F: FnOnce(ComposerSession) -> Fut,
    Fut: Future<Output = ComposerResult<ComposerSession>>,
{
    let session = ComposerSession::new(context.clone());
    let mut session = builder(session).await?;
    let payload = session.build_payload()?;

    let raw_transaction = context
        .generator
        .generate_raw_transaction(sender, payload, &options)
        .await
        .map_err(ComposerError::Fetch)?;
    info!(
        sender = %sender.to_hex_literal(),
        sequence_number = raw_transaction.sequence_number,
        fee_payer = options.with_fee_payer,
        "assembled script transaction"
    );

    let transaction = SimpleTransaction::new(raw_transaction);
    Ok(if options.with_fee_payer {
        transaction.with_fee_payer_placeholder()
    } else {
        transaction
    })
}
