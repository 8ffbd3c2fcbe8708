use super::money::Balance;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub date: String,
    pub amount: Balance,
    pub currency_code: String,
    #[serde(default)]
    pub client_commission: Option<Balance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentSchedule {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub content: String,
    pub payments: Vec<Installment>,
}

/// Buy-now-pay-later offer for the current order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPlan {
    pub is_bnpl_enabled: bool,
    #[serde(default)]
    pub offer_url: Option<String>,
    #[serde(default)]
    pub offer_text: Option<String>,
    #[serde(default)]
    pub graph_bnpl: Option<InstallmentSchedule>,
}

impl InstallmentPlan {
    pub fn payments(&self) -> &[Installment] {
        self.graph_bnpl
            .as_ref()
            .map(|graph| graph.payments.as_slice())
            .unwrap_or_default()
    }

    /// Amount due now when the plan is chosen.
    pub fn first_payment(&self) -> Option<Balance> {
        if !self.is_bnpl_enabled {
            return None;
        }
        self.payments().first().map(|p| p.amount)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn plan(amounts: &[i64]) -> InstallmentPlan {
        InstallmentPlan {
            is_bnpl_enabled: true,
            offer_url: None,
            offer_text: Some("Pay in parts".to_string()),
            graph_bnpl: Some(InstallmentSchedule {
                header: "Installments".to_string(),
                content: String::new(),
                payments: amounts
                    .iter()
                    .enumerate()
                    .map(|(i, amount)| Installment {
                        date: format!("2026-0{}-01", i + 1),
                        amount: Balance::from(*amount),
                        currency_code: "643".to_string(),
                        client_commission: None,
                    })
                    .collect(),
            }),
        }
    }
}
