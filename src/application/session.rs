//! Checkout state machine.
//!
//! One [`CheckoutSession`] drives one checkout on a single tokio task. Host
//! input arrives through a [`SessionHandle`] and is multiplexed with the
//! running step and the checkout deadline, so a dismissal or an expired timer
//! interrupts whatever the session is waiting on.

use super::assembly::SdkServices;
use super::auth::{AuthContext, AuthService};
use super::bank_apps::BankAppSelector;
use super::content::{CheckoutContent, ContentLoadOrchestrator, ContentType, Priority};
use super::gateway::Gateway;
use super::installment::InstallmentService;
use super::otp::OtpService;
use super::payment::TokenIssuance;
use super::timer::SessionTimer;
use super::user::UserService;
use super::validator::PayAmountValidator;
use super::verification::VerificationEngine;
use crate::domain::auth_info::AuthInfo;
use crate::domain::challenge::{ChallengeResolution, ConfirmMethod, FraudCheckResult};
use crate::domain::checkout::{
    CheckoutOutcome, PayAmountStatus, PaymentSheet, PaymentToken, PresentationEvent, Screen,
    SessionCommand, SessionState,
};
use crate::domain::ports::{AnalyticsEvent, PresenterBox};
use crate::domain::remote_config::RemoteConfig;
use crate::domain::user::PaymentTool;
use crate::error::{Result, SdkError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Wrong one-time codes accepted before the checkout fails.
pub const MAX_OTP_ATTEMPTS: u32 = 3;

const CONTENT: [(ContentType, Priority); 2] = [
    (ContentType::UserData, Priority::High),
    (ContentType::InstallmentPlan, Priority::Low),
];

/// Sends host input to a running checkout.
///
/// Every method returns `false` once the checkout has finished.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn select_tool(&self, payment_id: i64) -> bool {
        self.send(SessionCommand::SelectTool(payment_id))
    }

    pub fn select_installment(&self, selected: bool) -> bool {
        self.send(SessionCommand::SelectInstallment(selected))
    }

    pub fn confirm(&self) -> bool {
        self.send(SessionCommand::Confirm)
    }

    pub fn submit_otp(&self, code: impl Into<String>) -> bool {
        self.send(SessionCommand::SubmitOtp(code.into()))
    }

    pub fn resolve_challenge(&self, resolution: ChallengeResolution) -> bool {
        self.send(SessionCommand::ResolveChallenge(resolution))
    }

    pub fn redirect_url(&self, url: impl Into<String>) -> bool {
        self.send(SessionCommand::RedirectUrl(url.into()))
    }

    pub fn background(&self, at: Instant) -> bool {
        self.send(SessionCommand::Background(at))
    }

    pub fn foreground(&self, at: Instant) -> bool {
        self.send(SessionCommand::Foreground(at))
    }

    pub fn dismiss(&self) -> bool {
        self.send(SessionCommand::Dismiss)
    }

    pub fn is_finished(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Command inbox, deadline and interrupt handling for the running checkout.
struct Control {
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    timer: SessionTimer,
    gateway: Arc<Gateway>,
    auth: Option<Arc<AuthService>>,
    closed: bool,
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl Control {
    /// Drives `step` to completion unless the payer dismisses the checkout or
    /// the deadline passes first. Payer input that arrives meanwhile is
    /// dropped.
    async fn run<T, F>(&mut self, step: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::pin!(step);
        loop {
            let deadline = self.timer.deadline();
            tokio::select! {
                result = &mut step => return result,
                command = self.commands.recv(), if !self.closed => match command {
                    Some(command) => self.interrupt(command).await?,
                    None => self.closed = true,
                },
                _ = expiry(deadline) => return Err(self.expire()),
            }
        }
    }

    /// Waits for the next payer input.
    async fn next_input(&mut self) -> Result<SessionCommand> {
        loop {
            let deadline = self.timer.deadline();
            let command = tokio::select! {
                command = self.commands.recv() => command,
                _ = expiry(deadline) => return Err(self.expire()),
            };
            match command {
                None => {
                    self.closed = true;
                    debug!("checkout handle dropped while waiting for input");
                    return Err(SdkError::Cancelled);
                }
                Some(
                    command @ (SessionCommand::SelectTool(_)
                    | SessionCommand::SelectInstallment(_)
                    | SessionCommand::Confirm
                    | SessionCommand::SubmitOtp(_)
                    | SessionCommand::ResolveChallenge(_)),
                ) => return Ok(command),
                Some(command) => self.interrupt(command).await?,
            }
        }
    }

    async fn interrupt(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Dismiss => {
                info!("checkout dismissed");
                self.gateway.cancel_task();
                Err(SdkError::Cancelled)
            }
            SessionCommand::RedirectUrl(url) => {
                match &self.auth {
                    Some(auth) => {
                        auth.complete_redirect(&url).await;
                    }
                    None => debug!("redirect URL arrived before authentication"),
                }
                Ok(())
            }
            SessionCommand::Background(at) => {
                self.timer.on_background(at);
                Ok(())
            }
            SessionCommand::Foreground(at) => {
                self.timer.on_foreground(at);
                if self.timer.is_expired(at) {
                    return Err(self.expire());
                }
                Ok(())
            }
            other => {
                debug!(command = ?other, "input ignored while busy");
                Ok(())
            }
        }
    }

    fn expire(&mut self) -> SdkError {
        warn!("checkout timed out");
        self.gateway.cancel_task();
        SdkError::TimeOut
    }
}

/// One checkout from the merchant's request to a terminal state.
pub struct CheckoutSession {
    services: Arc<SdkServices>,
    auth_info: Arc<AuthInfo>,
    presenter: PresenterBox,
    preferred_bank: Option<String>,
    control: Control,
    state: SessionState,
    remote_config: Option<RemoteConfig>,
    installment_selected: bool,
}

impl CheckoutSession {
    /// Creates the session and the handle that feeds it.
    ///
    /// # Arguments
    ///
    /// * `services` - Graph shared by every checkout of the SDK instance.
    /// * `auth_info` - Snapshot of the merchant's request.
    /// * `presenter` - Receives every state change, screen and error.
    /// * `preferred_bank` - Bank app to use when it is installed.
    pub fn new(
        services: Arc<SdkServices>,
        auth_info: AuthInfo,
        presenter: PresenterBox,
        preferred_bank: Option<String>,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let control = Control {
            commands: rx,
            timer: SessionTimer::new(services.config.session_timeout()),
            gateway: services.gateway.clone(),
            auth: None,
            closed: false,
        };
        let session = Self {
            services,
            auth_info: Arc::new(auth_info),
            presenter,
            preferred_bank,
            control,
            state: SessionState::Initializing,
            remote_config: None,
            installment_selected: false,
        };
        (session, SessionHandle { commands: tx })
    }

    /// Runs the checkout to a terminal state.
    pub async fn run(mut self) -> CheckoutOutcome {
        self.present(PresentationEvent::StateChanged(SessionState::Initializing));
        let result = self.drive().await;
        self.finish(result).await
    }

    async fn drive(&mut self) -> Result<PaymentToken> {
        self.transition(SessionState::ConfigLoading);
        self.present(PresentationEvent::ShowScreen(Screen::Loading));
        let config = self.load_config().await?;

        self.transition(SessionState::Authenticating);
        self.control.timer.start(Instant::now());
        let auth = Arc::new(AuthService::new(
            self.auth_context(),
            self.auth_info.clone(),
            config.bank_apps.clone(),
            self.preferred_bank.clone(),
        ));
        self.control.auth = Some(auth.clone());
        let method = self.control.run(auth.obtain_session()).await?;
        self.control.run(auth.authenticate(method)).await?;

        self.transition(SessionState::ContentLoading);
        let services = self.services.clone();
        let user = Arc::new(UserService::new(
            services.gateway.clone(),
            services.credentials.clone(),
            self.auth_info.clone(),
        ));
        let installments = Arc::new(InstallmentService::new(
            services.gateway.clone(),
            services.credentials.clone(),
            services.toggles.clone(),
            services.config.bnpl_enabled,
            self.auth_info.clone(),
        ));
        let orchestrator = ContentLoadOrchestrator::new(Arc::new(CheckoutContent {
            user: user.clone(),
            installments: installments.clone(),
        }));
        self.control.run(orchestrator.load(&CONTENT)).await?;

        self.transition(SessionState::ToolSelection);
        let tool = self.choose_tool(&user, &installments).await?;
        self.installment_selected = installments.is_selected();

        let method = services.credentials.auth_method().await;
        if VerificationEngine::is_required(method) {
            self.transition(SessionState::Verifying);
            self.control
                .run(services.verification.verify(method, auth.as_ref()))
                .await?;
        }

        self.issue_token(&tool).await
    }

    fn auth_context(&self) -> AuthContext {
        let services = &self.services;
        AuthContext {
            gateway: services.gateway.clone(),
            credentials: services.credentials.clone(),
            toggles: services.toggles.clone(),
            storage: services.storage.clone(),
            selector: BankAppSelector::new(services.opener.clone(), services.storage.clone()),
            presenter: self.presenter.clone(),
            profile: services.config.profile,
            refresh_enabled: services.config.refresh_enabled,
            device_info: services.device_info.clone(),
        }
    }

    /// Fresh remote config, or the cached copy when the fetch fails.
    async fn load_config(&mut self) -> Result<RemoteConfig> {
        let services = self.services.clone();
        let config = match self.control.run(services.remote_config.load()).await {
            Ok(config) => config,
            Err(SdkError::Cancelled) => return Err(SdkError::Cancelled),
            Err(err) => match services.remote_config.current().await {
                Some(cached) => {
                    warn!(error = %err, "remote config fetch failed, using cached copy");
                    cached
                }
                None => return Err(err),
            },
        };
        self.remote_config = Some(config.clone());
        Ok(config)
    }

    async fn choose_tool(
        &mut self,
        user: &UserService,
        installments: &InstallmentService,
    ) -> Result<PaymentTool> {
        let wallet = user.user().await.ok_or(SdkError::NoData)?;
        let plan = installments.plan().await;
        let validator = PayAmountValidator::new(&wallet, plan.as_ref());

        let keep_preselected = user
            .selected_tool()
            .await
            .is_some_and(|tool| validator.check_amount_selected_tool(&tool) != PayAmountStatus::Insufficient);
        if !keep_preselected && let Some((best, _)) = validator.best_tool() {
            user.select_tool(best.payment_id).await?;
        }
        if let Some(tool) = user.selected_tool().await
            && validator.check_amount_selected_tool(&tool) == PayAmountStatus::OnlyInstallmentSufficient
        {
            installments.set_selected(true).await;
        }

        loop {
            let selected = user.selected_tool().await;
            let status = selected
                .as_ref()
                .map_or(PayAmountStatus::Insufficient, |tool| {
                    validator.check_amount_selected_tool(tool)
                });
            self.present(PresentationEvent::ShowScreen(Screen::PaymentSheet(PaymentSheet {
                merchant_name: wallet.merchant_info.merchant_name.clone(),
                order_amount: wallet.order_amount(),
                tools: wallet.tools().to_vec(),
                selected_payment_id: selected.as_ref().map(|tool| tool.payment_id),
                status: validator.check_wallet_amount_sufficiency(),
                plan: plan.clone(),
                installment_selected: installments.is_selected(),
            })));

            match self.control.next_input().await? {
                SessionCommand::SelectTool(payment_id) => {
                    if user.select_tool(payment_id).await.is_err() {
                        warn!(payment_id, "unknown payment tool selected");
                    } else if let Some(tool) = wallet.tool(payment_id)
                        && validator.check_amount_selected_tool(tool)
                            == PayAmountStatus::OnlyInstallmentSufficient
                    {
                        installments.set_selected(true).await;
                    }
                }
                SessionCommand::SelectInstallment(wanted) => {
                    let selected = installments.set_selected(wanted).await;
                    debug!(wanted, selected, "installment choice changed");
                }
                SessionCommand::Confirm => match (selected, status) {
                    (Some(tool), PayAmountStatus::Sufficient) => return Ok(tool),
                    (Some(tool), PayAmountStatus::OnlyInstallmentSufficient)
                        if installments.is_selected() =>
                    {
                        return Ok(tool);
                    }
                    (_, status) => warn!(?status, "confirmation rejected by amount check"),
                },
                other => debug!(command = ?other, "input ignored during tool selection"),
            }
        }
    }

    async fn issue_token(&mut self, tool: &PaymentTool) -> Result<PaymentToken> {
        let services = self.services.clone();
        let otp = OtpService::new(
            services.gateway.clone(),
            services.credentials.clone(),
            self.auth_info.merchant_login.clone(),
        );
        self.transition(SessionState::TokenIssuance);

        if services.credentials.snapshot().await.otp_required == Some(true) {
            self.otp_challenge(&otp, tool).await?;
            self.transition(SessionState::TokenIssuance);
        }

        let mut resolution = None;
        let mut challenges = 0;
        loop {
            let issuance = self
                .control
                .run(services.payments.issue_token(
                    &self.auth_info,
                    tool.payment_id,
                    self.installment_selected,
                    resolution,
                ))
                .await?;
            let check = match issuance {
                TokenIssuance::Issued(token) => return Ok(token),
                TokenIssuance::Challenge(check) => check,
            };
            if check.is_denied() {
                warn!("payment denied by fraud monitoring");
                return Err(SdkError::ErrorFromServer {
                    text: "payment denied by fraud monitoring".to_string(),
                    payload: None,
                });
            }
            if challenges >= services.config.max_challenge_retries {
                warn!(challenges, "fraud challenge still unresolved");
                return Err(SdkError::BadResponse);
            }
            challenges += 1;

            resolution = Some(match check.confirm_method_factor {
                Some(ConfirmMethod::Smsp) => {
                    self.otp_challenge(&otp, tool).await?;
                    ChallengeResolution::ConfirmedGenuine
                }
                _ => self.secure_challenge(&check).await?,
            });
            self.transition(SessionState::TokenIssuance);
        }
    }

    async fn otp_challenge(&mut self, otp: &OtpService, tool: &PaymentTool) -> Result<()> {
        self.transition(SessionState::OtpChallenge);
        let invoice = self.auth_info.order_id.clone().ok_or(SdkError::NoData)?;
        let model = self.control.run(otp.create_otp(&invoice, tool.payment_id)).await?;
        self.present(PresentationEvent::ShowScreen(Screen::Otp {
            phone: model.mobile_phone,
        }));

        let mut attempts = 0;
        loop {
            let SessionCommand::SubmitOtp(code) = self.control.next_input().await? else {
                continue;
            };
            match self
                .control
                .run(otp.confirm_otp(&invoice, &code, &tool.card_number))
                .await
            {
                Ok(()) => {
                    info!("one-time code confirmed");
                    return Ok(());
                }
                Err(err @ (SdkError::Cancelled | SdkError::TimeOut)) => return Err(err),
                Err(err) => {
                    attempts += 1;
                    warn!(attempts, error = %err, "one-time code rejected");
                    if attempts >= MAX_OTP_ATTEMPTS {
                        return Err(err);
                    }
                    self.show_error(&err);
                }
            }
        }
    }

    async fn secure_challenge(&mut self, check: &FraudCheckResult) -> Result<ChallengeResolution> {
        self.present(PresentationEvent::ShowScreen(Screen::SecureChallenge {
            form: check.form_parameters.clone(),
        }));
        loop {
            if let SessionCommand::ResolveChallenge(resolution) = self.control.next_input().await? {
                info!(?resolution, "fraud challenge answered");
                return Ok(resolution);
            }
        }
    }

    async fn finish(mut self, result: Result<PaymentToken>) -> CheckoutOutcome {
        self.control.timer.stop();
        let credentials = &self.services.credentials;
        let auth_method = credentials.auth_method().await;
        let (state, token) = match result {
            Ok(token) => (SessionState::Completed, Some(token)),
            Err(SdkError::Cancelled) => (SessionState::Cancelled, None),
            Err(err) => {
                self.show_error(&err);
                (SessionState::Failed(err), None)
            }
        };
        credentials.clear_session().await;

        let event = match &state {
            SessionState::Completed => AnalyticsEvent::good("Checkout"),
            _ => AnalyticsEvent::fail("Checkout"),
        };
        self.services.analytics.send(
            event
                .with("state", state.name())
                .with("auth_method", format!("{auth_method:?}")),
        );
        self.transition(state.clone());
        CheckoutOutcome {
            state,
            auth_method,
            token,
            installment_selected: self.installment_selected,
        }
    }

    fn transition(&mut self, state: SessionState) {
        info!(from = self.state.name(), to = state.name(), "checkout state changed");
        self.state = state.clone();
        self.present(PresentationEvent::StateChanged(state));
    }

    fn show_error(&self, error: &SdkError) {
        let fallback = error.merchant_description();
        let message = self
            .remote_config
            .as_ref()
            .map_or(fallback, |config| config.localized(error.description_key(), fallback))
            .to_string();
        self.present(PresentationEvent::ShowError {
            error: error.clone(),
            message,
        });
    }

    fn present(&self, event: PresentationEvent) {
        self.presenter.present(event);
    }
}
