use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;
use error_stack::{Report, ResultExt};
use tokio::sync::Mutex;

use crate::account::authorization::{build_authorization, AuthorizationRequest};
use crate::account::call_plan::{build_call_plan, CallPlan};
use crate::account::fees::estimate_fee;
use crate::account::session::{AccountSession, FrozenAccount};
use crate::account::signature::request_signature;
use crate::account::submitter::DelegatedSubmitter;
use crate::config::SponsorConfig;
use crate::constants::DEFAULT_NETWORK_TIMEOUT;
use crate::errors::{AccountError, AccountResult, EstimationError, PreconditionError, RpcError};
use crate::rpc::{Delegator, GasEstimate, HttpDelegator, Receipt, ThorClient, ThorNode, TransactionId};
use crate::signers::{KeyCustody, RelayIdentity};

/// Source of the current unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

/// Progress of a single `send_transaction` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Building,
    AwaitingSignature,
    Planning,
    Estimating,
    Submitting,
    Done(TransactionId),
    Failed(AccountError),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Building => write!(f, "building authorization"),
            PipelineState::AwaitingSignature => write!(f, "awaiting signature"),
            PipelineState::Planning => write!(f, "planning calls"),
            PipelineState::Estimating => write!(f, "estimating gas"),
            PipelineState::Submitting => write!(f, "submitting"),
            PipelineState::Done(id) => write!(f, "done ({})", id),
            PipelineState::Failed(e) => write!(f, "failed ({})", e),
        }
    }
}

pub trait PipelineObserver: Send + Sync {
    fn on_state_change(&self, state: &PipelineState);
}

/// Everything a successful send produced.
#[derive(Clone, Debug)]
pub struct SentTransaction {
    pub id: TransactionId,
    pub plan: CallPlan,
    pub gas: GasEstimate,
}

/// Single `send_transaction` invocation walking the states in order.
struct SendRun<'a> {
    state: PipelineState,
    observer: Option<&'a dyn PipelineObserver>,
}

impl<'a> SendRun<'a> {
    fn new(observer: Option<&'a dyn PipelineObserver>) -> Self {
        Self { state: PipelineState::Idle, observer }
    }

    fn enter(&mut self, state: PipelineState) {
        log::debug!("send: {} -> {}", self.state, state);
        self.state = state;
        if let Some(observer) = self.observer {
            observer.on_state_change(&self.state);
        }
    }

    fn finish<T>(&mut self, result: AccountResult<T>, id: impl Fn(&T) -> TransactionId) -> AccountResult<T> {
        match &result {
            Ok(value) => self.enter(PipelineState::Done(id(value))),
            Err(report) => self.enter(PipelineState::Failed(report.current_context().clone())),
        }
        result
    }
}

/// Sends calls through a sponsored smart account owned by the connected key.
pub struct AccountPipeline {
    session: AccountSession,
    node: Arc<dyn ThorNode>,
    custody: Arc<dyn KeyCustody>,
    submitter: DelegatedSubmitter,
    clock: Arc<dyn Clock>,
    network_timeout: Option<Duration>,
    signature_timeout: Option<Duration>,
    send_lock: Option<Mutex<()>>,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl AccountPipeline {
    pub fn new(
        node: Arc<dyn ThorNode>,
        custody: Arc<dyn KeyCustody>,
        delegator: Arc<dyn Delegator>,
        account_factory: Address,
    ) -> Self {
        Self {
            session: AccountSession::new(node.clone(), account_factory),
            submitter: DelegatedSubmitter::new(
                node.clone(),
                delegator,
                RelayIdentity::process_wide().clone(),
            ),
            node,
            custody,
            clock: Arc::new(SystemClock),
            network_timeout: Some(DEFAULT_NETWORK_TIMEOUT),
            signature_timeout: None,
            send_lock: Some(Mutex::new(())),
            observer: None,
        }
    }

    /// Connects to the node and delegator named in `config`.
    pub fn from_config(config: &SponsorConfig, custody: Arc<dyn KeyCustody>) -> AccountResult<Self> {
        config.validate()?;
        let node = ThorClient::new(&config.node_url, config.network_timeout)?;
        let delegator = HttpDelegator::new(&config.delegator_url, config.network_timeout)?;
        Ok(Self::new(Arc::new(node), custody, Arc::new(delegator), config.account_factory)
            .with_network_timeout(Some(config.network_timeout))
            .with_serialized_sends(config.serialize_sends))
    }

    pub fn with_relay(mut self, relay: RelayIdentity) -> Self {
        self.submitter = self.submitter.with_relay(relay);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_network_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.network_timeout = timeout;
        self
    }

    pub fn with_signature_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.signature_timeout = timeout;
        self
    }

    pub fn with_serialized_sends(mut self, serialize_sends: bool) -> Self {
        self.send_lock = serialize_sends.then(|| Mutex::new(()));
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Resolves the chain identity, then derives the account of the connected owner.
    pub async fn connect(&self) -> AccountResult<Option<Address>> {
        self.session.refresh_chain_identity().await.attach_printable("Connecting to node")?;
        Ok(self.on_owner_changed().await)
    }

    /// Re-reads the owner from custody and derives its account address.
    pub async fn on_owner_changed(&self) -> Option<Address> {
        self.session.set_owner(self.custody.owner_address()).await
    }

    pub async fn account_address(&self) -> Option<Address> {
        self.session.account_address().await
    }

    /// Node handle for read-only queries.
    pub fn client(&self) -> Arc<dyn ThorNode> {
        self.node.clone()
    }

    pub fn session(&self) -> &AccountSession {
        &self.session
    }

    pub fn relay(&self) -> &RelayIdentity {
        self.submitter.relay()
    }

    pub async fn send_transaction(&self, request: AuthorizationRequest) -> AccountResult<TransactionId> {
        Ok(self.send_transaction_detailed(request).await?.id)
    }

    pub async fn send_transaction_detailed(
        &self,
        request: AuthorizationRequest,
    ) -> AccountResult<SentTransaction> {
        let _guard = match &self.send_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        let mut run = SendRun::new(self.observer.as_deref());
        let result = self.run(&mut run, &request).await;
        run.finish(result, |sent| sent.id.clone())
    }

    async fn run(&self, run: &mut SendRun<'_>, request: &AuthorizationRequest) -> AccountResult<SentTransaction> {
        run.enter(PipelineState::Building);
        let account = self.freeze().await?;
        self.ensure_owner_unchanged(&account)?;
        let document = build_authorization(request, &account, self.clock.now()).map_err(|report| {
            let reason = report.current_context().to_string();
            report.change_context(AccountError::Precondition(PreconditionError::InvalidCallData(
                reason,
            )))
        })?;

        run.enter(PipelineState::AwaitingSignature);
        let signed =
            request_signature(self.custody.as_ref(), document, self.signature_timeout).await?;

        run.enter(PipelineState::Planning);
        let planning = build_call_plan(self.node.as_ref(), self.session.factory(), &signed, &account);
        let plan = match self.network_timeout {
            Some(timeout) => tokio::time::timeout(timeout, planning).await.map_err(|_| {
                Report::new(AccountError::EstimationFailed(EstimationError::Timeout))
                    .attach_printable("Checking account deployment timed out")
            })?,
            None => planning.await,
        }?;

        run.enter(PipelineState::Estimating);
        let gas =
            estimate_fee(self.node.as_ref(), &plan, self.relay().address(), self.network_timeout)
                .await?;

        run.enter(PipelineState::Submitting);
        let id = self.submitter.submit(&plan, gas.total_gas, self.network_timeout).await?;

        Ok(SentTransaction { id, plan, gas })
    }

    /// Custody must still hold the key the account was derived for.
    fn ensure_owner_unchanged(&self, account: &FrozenAccount) -> AccountResult<()> {
        match self.custody.owner_address() {
            Some(owner) if owner == account.owner => Ok(()),
            Some(owner) => Err(Report::new(AccountError::Precondition(
                PreconditionError::StaleAccountAddress { owner, derived_for: account.owner },
            ))
            .attach_printable("Owner changed without a new account derivation")),
            None => Err(Report::new(AccountError::Precondition(PreconditionError::MissingOwner))),
        }
    }

    /// Snapshot of the session, resolving the chain identity when still unknown.
    async fn freeze(&self) -> AccountResult<FrozenAccount> {
        if self.session.snapshot().await.chain.is_none() {
            self.session.refresh_chain_identity().await.map_err(|report| {
                report.change_context(AccountError::Precondition(
                    PreconditionError::ChainIdentityUnresolved,
                ))
            })?;
        }
        self.session.snapshot().await.freeze()
    }

    /// Polls for the receipt of `id` until it is included or `timeout` elapses.
    pub async fn wait_for_transaction(
        &self,
        id: &TransactionId,
        timeout: Duration,
        poll_interval: Duration,
    ) -> AccountResult<Receipt> {
        wait_for_receipt(self.node.as_ref(), id, timeout, poll_interval).await
    }
}

pub async fn wait_for_receipt(
    node: &dyn ThorNode,
    id: &TransactionId,
    timeout: Duration,
    poll_interval: Duration,
) -> AccountResult<Receipt> {
    let polling = async {
        loop {
            if let Some(receipt) = node.get_receipt(id).await? {
                return Ok::<_, Report<AccountError>>(receipt);
            }
            tokio::time::sleep(poll_interval).await;
        }
    };
    tokio::time::timeout(timeout, polling).await.map_err(|_| {
        crate::account_error!(
            AccountError::Rpc(RpcError::Timeout),
            "Transaction {} not included within {:?}",
            id,
            timeout
        )
    })?
}
