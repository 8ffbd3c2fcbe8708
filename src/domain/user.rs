use super::money::{AmountData, Balance};
use crate::error::{Result, SdkError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTool {
    pub product_name: String,
    pub payment_id: i64,
    #[serde(default)]
    pub priority_card: bool,
    #[serde(default)]
    pub payment_source_type: String,
    /// Masked card number, e.g. `**** 1234`.
    pub card_number: String,
    #[serde(default)]
    pub card_logo_url: Option<String>,
    pub amount_data: AmountData,
    #[serde(default)]
    pub count_additional_cards: Option<u32>,
}

impl PaymentTool {
    pub fn balance(&self) -> Balance {
        self.amount_data.amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentToolInfo {
    pub payment_tool_list: Vec<PaymentTool>,
    #[serde(default)]
    pub additional_cards: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantInfo {
    pub merchant_name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub order_amount: AmountData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub gender: Option<u8>,
}

/// Payer profile, payment tools and order summary for one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub session_id: Option<String>,
    pub payment_tool_info: PaymentToolInfo,
    pub merchant_info: MerchantInfo,
    pub order_info: OrderInfo,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

impl User {
    /// Rejects tool lists with more than one priority tool.
    pub fn validate(&self) -> Result<()> {
        let priority = self
            .tools()
            .iter()
            .filter(|tool| tool.priority_card)
            .count();
        if priority > 1 {
            return Err(SdkError::FailDecode(format!(
                "{priority} payment tools are marked as priority"
            )));
        }
        Ok(())
    }

    pub fn tools(&self) -> &[PaymentTool] {
        &self.payment_tool_info.payment_tool_list
    }

    pub fn order_amount(&self) -> Balance {
        self.order_info.order_amount.amount
    }

    pub fn priority_tool(&self) -> Option<&PaymentTool> {
        self.tools().iter().find(|tool| tool.priority_card)
    }

    pub fn tool(&self, payment_id: i64) -> Option<&PaymentTool> {
        self.tools().iter().find(|tool| tool.payment_id == payment_id)
    }

    pub fn additional_cards(&self) -> bool {
        self.payment_tool_info.additional_cards.unwrap_or(false)
            || self
                .priority_tool()
                .and_then(|tool| tool.count_additional_cards)
                .is_some_and(|count| count > 1)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn tool(payment_id: i64, balance: i64, priority: bool) -> PaymentTool {
        PaymentTool {
            product_name: format!("Card {payment_id}"),
            payment_id,
            priority_card: priority,
            payment_source_type: "card".to_string(),
            card_number: format!("**** {payment_id:04}"),
            card_logo_url: None,
            amount_data: AmountData {
                amount: Balance::from(balance),
                currency: "643".to_string(),
            },
            count_additional_cards: None,
        }
    }

    pub fn user(order_amount: i64, tools: Vec<PaymentTool>) -> User {
        User {
            session_id: None,
            payment_tool_info: PaymentToolInfo {
                payment_tool_list: tools,
                additional_cards: None,
            },
            merchant_info: MerchantInfo {
                merchant_name: "Shop".to_string(),
                logo_url: None,
            },
            order_info: OrderInfo {
                order_amount: AmountData {
                    amount: Balance::from(order_amount),
                    currency: "643".to_string(),
                },
            },
            user_info: None,
        }
    }
}
