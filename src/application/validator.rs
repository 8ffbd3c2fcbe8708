use crate::domain::checkout::PayAmountStatus;
use crate::domain::installment::InstallmentPlan;
use crate::domain::money::Balance;
use crate::domain::user::{PaymentTool, User};

/// Compares wallet balances with the order amount and the installment plan.
///
/// Ties are broken by server order: the first tool that qualifies wins.
pub struct PayAmountValidator<'a> {
    user: &'a User,
    plan: Option<&'a InstallmentPlan>,
}

impl<'a> PayAmountValidator<'a> {
    pub fn new(user: &'a User, plan: Option<&'a InstallmentPlan>) -> Self {
        Self { user, plan }
    }

    fn first_installment(&self) -> Option<Balance> {
        self.plan.and_then(InstallmentPlan::first_payment)
    }

    /// Status of a single tool.
    pub fn check_amount_selected_tool(&self, tool: &PaymentTool) -> PayAmountStatus {
        if tool.balance() >= self.user.order_amount() {
            PayAmountStatus::Sufficient
        } else if self
            .first_installment()
            .is_some_and(|first| tool.balance() >= first)
        {
            PayAmountStatus::OnlyInstallmentSufficient
        } else {
            PayAmountStatus::Insufficient
        }
    }

    /// Best tool in the wallet together with its status.
    pub fn best_tool(&self) -> Option<(&'a PaymentTool, PayAmountStatus)> {
        let tools = self.user.tools();
        for wanted in [
            PayAmountStatus::Sufficient,
            PayAmountStatus::OnlyInstallmentSufficient,
        ] {
            if let Some(tool) = tools
                .iter()
                .find(|tool| self.check_amount_selected_tool(tool) == wanted)
            {
                return Some((tool, wanted));
            }
        }
        None
    }

    /// Status of the wallet as a whole.
    pub fn check_wallet_amount_sufficiency(&self) -> PayAmountStatus {
        self.best_tool()
            .map(|(_, status)| status)
            .unwrap_or(PayAmountStatus::Insufficient)
    }
}
