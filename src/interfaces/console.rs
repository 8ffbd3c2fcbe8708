//! Headless stand-ins for the host UI and the bank app, used by the CLI.

use crate::application::session::SessionHandle;
use crate::domain::challenge::ChallengeResolution;
use crate::domain::checkout::{PaymentSheet, PresentationEvent, Screen, SessionState};
use crate::domain::ports::UrlOpener;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Bank app that approves every handoff at once.
///
/// Each opened link produces a successful redirect back to `redirect_uri`,
/// delivered on the receiver returned by [`SimulatedBankApp::new`].
pub struct SimulatedBankApp {
    redirect_uri: String,
    redirects: mpsc::UnboundedSender<String>,
}

impl SimulatedBankApp {
    pub fn new(redirect_uri: &str) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (redirects, rx) = mpsc::unbounded_channel();
        let app = Self {
            redirect_uri: redirect_uri.to_string(),
            redirects,
        };
        (app, rx)
    }
}

#[async_trait]
impl UrlOpener for SimulatedBankApp {
    async fn can_open(&self, _url: &str) -> bool {
        true
    }

    async fn open(&self, url: &str) -> bool {
        info!(%url, "bank app opened");
        let code = Uuid::new_v4().simple().to_string();
        self.redirects
            .send(format!("{}?code={code}&status=success", self.redirect_uri))
            .is_ok()
    }
}

/// Answers the checkout's screens the way a payer following a script would.
#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    /// Tool to pay with. The checkout's pre-selection is kept when unset.
    pub payment_id: Option<i64>,
    /// Pays with the installment plan when one is offered.
    pub installment: bool,
    pub otp_code: String,
}

impl Autopilot {
    /// Drives one checkout until it reaches a terminal state.
    pub async fn drive(
        self,
        mut events: mpsc::UnboundedReceiver<PresentationEvent>,
        handle: SessionHandle,
    ) -> Option<SessionState> {
        let mut confirmed = false;
        let mut entering_otp = false;
        while let Some(event) = events.recv().await {
            match event {
                PresentationEvent::StateChanged(state) => {
                    info!(state = state.name(), "checkout state");
                    if state.is_terminal() {
                        return Some(state);
                    }
                    entering_otp = state == SessionState::OtpChallenge;
                }
                PresentationEvent::ShowScreen(Screen::PaymentSheet(sheet)) => {
                    if confirmed {
                        warn!("payment sheet rejected the confirmation, dismissing");
                        handle.dismiss();
                    } else {
                        confirmed = self.answer_sheet(&sheet, &handle);
                    }
                }
                PresentationEvent::ShowScreen(Screen::Otp { phone }) => {
                    info!(?phone, "entering one-time code");
                    handle.submit_otp(self.otp_code.clone());
                }
                PresentationEvent::ShowError { error, message } if entering_otp => {
                    warn!(%error, %message, "one-time code rejected, retrying");
                    handle.submit_otp(self.otp_code.clone());
                }
                PresentationEvent::ShowScreen(Screen::SecureChallenge { .. }) => {
                    handle.resolve_challenge(ChallengeResolution::ConfirmedGenuine);
                }
                PresentationEvent::ShowScreen(screen) => info!(?screen, "screen shown"),
                PresentationEvent::ShowError { error, message } => {
                    warn!(%error, %message, "error shown")
                }
            }
        }
        None
    }

    /// Returns `true` once the sheet has been confirmed.
    fn answer_sheet(&self, sheet: &PaymentSheet, handle: &SessionHandle) -> bool {
        info!(
            merchant = %sheet.merchant_name,
            amount = %sheet.order_amount,
            tools = sheet.tools.len(),
            status = ?sheet.status,
            "payment sheet shown"
        );
        if let Some(payment_id) = self.payment_id
            && sheet.selected_payment_id != Some(payment_id)
            && sheet.tools.iter().any(|tool| tool.payment_id == payment_id)
        {
            handle.select_tool(payment_id);
            return false;
        }
        if self.installment && sheet.plan.is_some() && !sheet.installment_selected {
            handle.select_installment(true);
            return false;
        }
        handle.confirm()
    }
}
