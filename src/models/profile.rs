use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account's public profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub subscription: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }
}

/// Billing state as reported by the payment processor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    #[default]
    None,
    Trialing,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "trialing" => Some(Self::Trialing),
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionStatus {
    pub tier: SubscriptionTier,
    pub state: SubscriptionState,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    /// Whether paid features are unlocked.
    pub fn is_active(&self) -> bool {
        self.tier == SubscriptionTier::Pro
            && matches!(
                self.state,
                SubscriptionState::Active | SubscriptionState::Trialing
            )
    }
}

/// Input for creating a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfileInput {
    pub email: String,
    pub display_name: Option<String>,
}

/// Subscription change pushed by the billing webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub profile_id: Uuid,
    pub tier: SubscriptionTier,
    pub state: SubscriptionState,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Response body for a subscription lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub profile_id: Uuid,
    #[serde(flatten)]
    pub status: SubscriptionStatus,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_paid_running_subscriptions_are_active() {
        let mut status = SubscriptionStatus {
            tier: SubscriptionTier::Pro,
            state: SubscriptionState::Trialing,
            current_period_end: None,
        };
        assert!(status.is_active());

        status.state = SubscriptionState::PastDue;
        assert!(!status.is_active());

        status.tier = SubscriptionTier::Free;
        status.state = SubscriptionState::Active;
        assert!(!status.is_active());
    }
}
